use std::ops::Deref;

use tracing::debug;

use crate::Client;

/// Reason given to requests still outstanding when a scope is dropped.
pub const SCOPE_CLOSED_MESSAGE: &str = "scope closed";

/// One client for the lifetime of an owning context.
///
/// The client is disposed when the scope ends, whether through
/// [`ClientScope::close`] or by being dropped.
pub struct ClientScope {
    client: Client,
    closed: bool,
}

impl ClientScope {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            closed: false,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Ends the scope, cancelling outstanding requests with `reason`.
    pub fn close(mut self, reason: Option<&str>) -> usize {
        self.closed = true;
        self.client.dispose(reason)
    }
}

impl Deref for ClientScope {
    type Target = Client;

    fn deref(&self) -> &Client {
        &self.client
    }
}

impl Drop for ClientScope {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let cancelled = self.client.dispose(Some(SCOPE_CLOSED_MESSAGE));
        if cancelled > 0 {
            debug!("client scope dropped with {cancelled} request(s) outstanding");
        }
    }
}
