//! In-memory transport for tests or offline fixtures.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::{BoxFuture, Method, Transport, TransportError, TransportRequest, TransportResponse};

/// How a registered route answers.
#[derive(Debug, Clone)]
pub enum Route {
    /// Answer with `status` and `body` after `delay`. Non-2xx statuses surface
    /// as [`TransportError::Status`].
    Reply {
        status: u16,
        body: Bytes,
        delay: Duration,
    },
    /// Fail as if the connection broke.
    Network(String),
    /// Fail with an error the transport cannot classify.
    Other(String),
    /// Never answer; the call only ends by timeout or by being dropped.
    Pending,
}

impl Route {
    pub fn json(value: &Value) -> Self {
        Self::Reply {
            status: 200,
            body: Bytes::from(value.to_string()),
            delay: Duration::ZERO,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Reply {
            status: 200,
            body: Bytes::from(text.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self::Reply {
            status,
            body: Bytes::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(self, by: Duration) -> Self {
        match self {
            Self::Reply { status, body, .. } => Self::Reply {
                status,
                body,
                delay: by,
            },
            other => other,
        }
    }
}

#[derive(Default)]
pub struct MemoryTransport {
    routes: RwLock<HashMap<(Method, String), Route>>,
    received: Mutex<Vec<TransportRequest>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, method: Method, url: impl Into<String>, route: Route) {
        self.routes.write().insert((method, url.into()), route);
    }

    pub fn with_route(self, method: Method, url: impl Into<String>, route: Route) -> Self {
        self.route(method, url, route);
        self
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.received.lock().clone()
    }

    fn lookup(&self, method: Method, url: &str) -> Option<Route> {
        self.routes.read().get(&(method, url.to_string())).cloned()
    }
}

async fn answer(route: Option<Route>) -> Result<TransportResponse, TransportError> {
    match route {
        Some(Route::Reply {
            status,
            body,
            delay,
        }) => {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if (200..300).contains(&status) {
                Ok(TransportResponse { status, body })
            } else {
                Err(TransportError::status(status, body))
            }
        }
        Some(Route::Network(message)) => Err(TransportError::network(message)),
        Some(Route::Other(message)) => Err(TransportError::other(std::io::Error::other(message))),
        Some(Route::Pending) => std::future::pending().await,
        None => Err(TransportError::status(404, Bytes::new())),
    }
}

impl Transport for MemoryTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        let route = self.lookup(request.method, &request.url);
        let timeout = request.timeout;
        self.received.lock().push(request);

        Box::pin(async move {
            match tokio::time::timeout(timeout, answer(route)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout { after: timeout }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::{MemoryTransport, Route};
    use crate::{Method, Transport, TransportError, TransportRequest};

    fn get(url: &str) -> TransportRequest {
        TransportRequest::new(Method::Get, url, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn answers_registered_route() {
        let t = MemoryTransport::new().with_route(Method::Get, "/a", Route::json(&json!({ "k": 1 })));
        let resp = t.send(get("/a")).await.unwrap();
        assert_eq!(resp.json_or_text(), json!({ "k": 1 }));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let t = MemoryTransport::new();
        let err = t.send(get("/missing")).await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.status_text(), Some("Not Found"));
    }

    #[tokio::test]
    async fn method_is_part_of_the_route() {
        let t = MemoryTransport::new().with_route(Method::Post, "/a", Route::text("ok"));
        assert!(t.send(get("/a")).await.is_err());
    }

    #[tokio::test]
    async fn pending_route_times_out() {
        let t = MemoryTransport::new().with_route(Method::Get, "/hang", Route::Pending);
        let req = TransportRequest::new(Method::Get, "/hang", Duration::from_millis(20));
        let err = t.send(req).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));
    }

    #[tokio::test]
    async fn records_requests_in_order() {
        let t = MemoryTransport::new()
            .with_route(Method::Get, "/a", Route::text("a"))
            .with_route(Method::Get, "/b", Route::status(500));
        let _ = t.send(get("/a")).await;
        let _ = t.send(get("/b")).await;

        let urls: Vec<_> = t.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["/a".to_string(), "/b".to_string()]);
    }
}
