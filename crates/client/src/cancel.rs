use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

/// Message used when a request is cancelled without a reason.
pub const DEFAULT_CANCEL_MESSAGE: &str = "request cancelled";

/// Cloneable cancellation handle with an optional human-readable reason.
///
/// The first `cancel` call fixes the reason; later calls are no-ops.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
    reason: Arc<OnceLock<Option<String>>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self, reason: Option<&str>) {
        self.reason.get_or_init(|| reason.map(str::to_owned));
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.get().and_then(|r| r.as_deref())
    }

    /// Resolves once the handle is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// The message a request cancelled through this handle settles with.
    pub fn message(&self) -> &str {
        self.reason().unwrap_or(DEFAULT_CANCEL_MESSAGE)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl From<CancellationToken> for CancelHandle {
    fn from(token: CancellationToken) -> Self {
        Self {
            token,
            reason: Arc::default(),
        }
    }
}
