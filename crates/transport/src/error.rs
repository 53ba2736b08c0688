use std::time::Duration;

use bytes::Bytes;

/// Failure to obtain a 2xx response from the remote end.
#[derive(Debug)]
pub enum TransportError {
    /// The remote answered with a non-2xx status.
    Status {
        status: u16,
        /// Reason phrase sent by the server, else the canonical one; empty
        /// for unregistered codes without a phrase.
        status_text: String,
        body: Bytes,
    },
    Timeout {
        after: Duration,
    },
    /// Connect, IO or protocol failure.
    Network {
        message: String,
    },
    InvalidUrl {
        url: String,
        message: String,
    },
    /// Anything the transport cannot classify. Carried unchanged and
    /// transparent: `Display` and `source()` are the inner error's own.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    pub fn status(status: u16, body: impl Into<Bytes>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self::Status {
            status,
            status_text,
            body: body.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn other(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(source))
    }

    /// The remote status text, if the remote answered and supplied one.
    pub fn status_text(&self) -> Option<&str> {
        match self {
            TransportError::Status { status_text, .. } if !status_text.is_empty() => {
                Some(status_text.as_str())
            }
            _ => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Status {
                status,
                status_text,
                ..
            } => {
                if status_text.is_empty() {
                    write!(f, "HTTP {status}")
                } else {
                    write!(f, "HTTP {status} {status_text}")
                }
            }
            TransportError::Timeout { after } => write!(f, "request timed out after {after:?}"),
            TransportError::Network { message } => write!(f, "{message}"),
            TransportError::InvalidUrl { url, message } => write!(f, "invalid url {url:?}: {message}"),
            TransportError::Other(source) => write!(f, "{source}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Other(source) => source.source(),
            _ => None,
        }
    }
}
