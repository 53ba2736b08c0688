use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use serde_json::Value;
use transport::{Method, TransportRequest};

use crate::CancelHandle;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Defaults applied to every request of a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub default_timeout: Duration,
    /// Header name -> value. Names are compared case-insensitively.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut default_headers = BTreeMap::new();
        default_headers.insert("accept".to_string(), "application/json".to_string());
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            default_headers,
        }
    }
}

impl ClientConfig {
    /// Reads `APICALL_TIMEOUT_SECS`; everything else keeps its default.
    pub fn from_env() -> Self {
        Self {
            default_timeout: Duration::from_secs(env_var_u64(
                "APICALL_TIMEOUT_SECS",
                DEFAULT_TIMEOUT.as_secs(),
            )),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.default_headers
            .insert(name.to_ascii_lowercase(), value.into());
        self
    }
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

/// Per-request settings. Every field left unset falls back to the client's
/// [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
    /// A caller-owned handle. Requests carrying one are not registered with
    /// the client, so `dispose` does not reach them.
    pub cancel: Option<CancelHandle>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_with(mut self, handle: impl Into<CancelHandle>) -> Self {
        self.cancel = Some(handle.into());
        self
    }

    /// Shallow merge over `config`: caller fields win, headers merge per name.
    /// Returns the request and the caller's cancel handle, if any.
    pub(crate) fn into_request(
        self,
        method: Method,
        url: String,
        config: &ClientConfig,
    ) -> (TransportRequest, Option<CancelHandle>) {
        let mut headers = lowercase_names(config.default_headers.clone());
        headers.extend(lowercase_names(self.headers));

        let request = TransportRequest {
            method,
            url,
            headers,
            query: self.query,
            body: self.body,
            timeout: self.timeout.unwrap_or(config.default_timeout),
        };
        (request, self.cancel)
    }
}

/// The fields are public, so names inserted directly may carry any case.
fn lowercase_names(headers: BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect()
}
