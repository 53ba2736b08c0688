use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use client::{
    Client, ClientConfig, ClientError, ClientScope, Method, RequestOptions, TransportConfig,
};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Call a JSON API and print the unwrapped data")]
struct Cli {
    /// Base URL for relative paths (default: $APICALL_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Request timeout in seconds (default: $APICALL_TIMEOUT_SECS or 60)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Extra header, as 'Name: value'. May be repeated.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Get(Call),
    Post(Call),
    Put(Call),
    Patch(Call),
    Delete(Call),
}

#[derive(Args, Debug)]
struct Call {
    /// Path relative to the base URL, or an absolute http(s) URL
    url: String,

    /// JSON request body
    #[arg(long)]
    data: Option<String>,

    /// Query parameter, as 'key=value'. May be repeated.
    #[arg(short, long)]
    query: Vec<String>,
}

impl Command {
    fn into_parts(self) -> (Method, Call) {
        match self {
            Command::Get(call) => (Method::Get, call),
            Command::Post(call) => (Method::Post, call),
            Command::Put(call) => (Method::Put, call),
            Command::Patch(call) => (Method::Patch, call),
            Command::Delete(call) => (Method::Delete, call),
        }
    }
}

#[derive(Debug)]
enum CliError {
    Usage(String),
    Client(ClientError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Client(err) => write!(f, "{err}"),
        }
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        CliError::Client(err)
    }
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Client(err) if err.is_cancelled() => ExitCode::from(130),
            CliError::Client(ClientError::Application { .. }) => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("apicall failed: {err}");
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut transport_config = TransportConfig::from_env();
    if let Some(base_url) = cli.base_url {
        transport_config.base_url = Some(base_url);
    }

    let mut config = ClientConfig::from_env();
    if let Some(secs) = cli.timeout_secs {
        config.default_timeout = Duration::from_secs(secs);
    }

    let (method, call) = cli.command.into_parts();
    let options = build_options(&cli.headers, &call)?;

    let scope = ClientScope::new(Client::with_http(transport_config, config)?);
    let mut pending = scope.request::<Value>(method, call.url.as_str(), options);
    info!("{method} {} dispatched as request {}", call.url, pending.id());

    let value = tokio::select! {
        result = &mut pending => result?,
        _ = tokio::signal::ctrl_c() => {
            scope.dispose(Some("interrupted"));
            pending.await?
        }
    };

    let text = serde_json::to_string_pretty(&value)
        .map_err(|e| CliError::Usage(format!("failed to render response: {e}")))?;
    println!("{text}");
    Ok(())
}

fn build_options(headers: &[String], call: &Call) -> Result<RequestOptions, CliError> {
    let mut options = RequestOptions::new();

    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| CliError::Usage(format!("header must be 'Name: value': {header}")))?;
        options = options.header(name.trim(), value.trim());
    }

    for pair in &call.query {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| CliError::Usage(format!("query must be 'key=value': {pair}")))?;
        options = options.query(key, value);
    }

    if let Some(data) = &call.data {
        let body: Value = serde_json::from_str(data)
            .map_err(|e| CliError::Usage(format!("--data is not valid JSON: {e}")))?;
        options = options.body(body);
    }

    Ok(options)
}
