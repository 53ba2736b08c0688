use transport::TransportError;

/// Message carried by an application failure; the code identifies the cause.
pub const APPLICATION_FAILURE_MESSAGE: &str = "request failed";

/// The single error kind a request can settle with.
///
/// Only [`ClientError::Application`] carries a code. Errors the client cannot
/// classify ([`ClientError::Decode`], [`ClientError::Other`]) are passed through
/// transparently: both `Display` and `source()` are the original error's.
#[derive(Debug)]
pub enum ClientError {
    Cancelled {
        message: String,
    },
    Transport {
        message: String,
        status: Option<u16>,
    },
    /// The server answered with an envelope whose `result` is not the
    /// success sentinel.
    Application {
        code: i64,
        message: String,
    },
    Decode(serde_json::Error),
    Other(Box<dyn std::error::Error + Send + Sync>),
    /// Construction-time failure; never produced by a request.
    Config {
        message: String,
    },
}

impl ClientError {
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    pub fn application(code: i64) -> Self {
        Self::Application {
            code,
            message: APPLICATION_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            ClientError::Application { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled { .. })
    }

    /// HTTP status of a transport failure, when the remote answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Other(source) => ClientError::Other(source),
            err => ClientError::Transport {
                message: err
                    .status_text()
                    .map(str::to_owned)
                    .unwrap_or_else(|| err.to_string()),
                status: err.status_code(),
            },
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Cancelled { message } => write!(f, "{message}"),
            ClientError::Transport { message, .. } => write!(f, "{message}"),
            ClientError::Application { code, message } => write!(f, "{message} (result {code})"),
            ClientError::Decode(source) => write!(f, "{source}"),
            ClientError::Other(source) => write!(f, "{source}"),
            ClientError::Config { message } => write!(f, "invalid client configuration: {message}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Decode(source) => source.source(),
            ClientError::Other(source) => source.source(),
            _ => None,
        }
    }
}
