//! JSON client with a per-instance cancellation registry.
//!
//! Every request gets a fresh [`RequestId`] and, unless the caller brought its
//! own [`CancelHandle`], a registered handle that [`Client::dispose`] can
//! reach. Registration happens synchronously when the request is created, so
//! ids follow call order even when callers race.
//!
//! ```text
//! request()  -> next id, register handle  -> PendingRequest
//! .await     -> race transport vs handle  -> unregister -> settle
//! dispose()  -> cancel every registered handle (entries leave on settle)
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use transport::{
    BoxFuture, HttpTransport, Method, Transport, TransportConfig, TransportError,
    TransportResponse,
};

use crate::envelope::Parsed;
use crate::registry::{Registry, RequestId};
use crate::{CancelHandle, ClientConfig, ClientError, RequestOptions};

struct Shared {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    registry: Mutex<Registry>,
}

/// A cancellable JSON-over-HTTP client.
///
/// The registry is owned by this instance alone; create one client per
/// consuming context and dispose it when that context ends (see
/// [`crate::ClientScope`]).
pub struct Client {
    shared: Arc<Shared>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                config,
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    /// Builds a client over [`HttpTransport`].
    pub fn with_http(
        transport: TransportConfig,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let http = HttpTransport::new(transport).map_err(|e| ClientError::Config {
            message: e.to_string(),
        })?;
        Ok(Self::new(Arc::new(http), config))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Issues a request.
    ///
    /// The id is assigned and the cancel handle registered before this
    /// returns. The returned future yields the envelope's `data` on success,
    /// the raw body for non-enveloped responses, and a [`ClientError`]
    /// otherwise. The registry entry is gone by the time it yields, and also
    /// when it is dropped unfinished.
    pub fn request<T>(
        &self,
        method: Method,
        url: impl Into<String>,
        options: RequestOptions,
    ) -> PendingRequest<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (request, caller_cancel) =
            options.into_request(method, url.into(), &self.shared.config);

        let (id, cancel, registered) = {
            let mut registry = self.shared.registry.lock();
            let id = registry.next_id();
            match caller_cancel {
                Some(handle) => (id, handle, false),
                None => {
                    let handle = CancelHandle::new();
                    registry.insert(id, handle.clone());
                    (id, handle, true)
                }
            }
        };

        let guard = Unregister {
            shared: self.shared.clone(),
            id,
            registered,
        };
        let shared = self.shared.clone();

        let inner = Box::pin(async move {
            debug!("request {id}: {} {}", request.method, request.url);
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ClientError::cancelled(cancel.message())),
                result = shared.transport.send(request) => settle(id, result),
            };
            drop(guard);
            outcome
        });

        PendingRequest { id, inner }
    }

    pub fn get<T>(&self, url: impl Into<String>, options: RequestOptions) -> PendingRequest<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.request(Method::Get, url, options)
    }

    pub fn post<T>(&self, url: impl Into<String>, options: RequestOptions) -> PendingRequest<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.request(Method::Post, url, options)
    }

    pub fn put<T>(&self, url: impl Into<String>, options: RequestOptions) -> PendingRequest<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.request(Method::Put, url, options)
    }

    pub fn patch<T>(&self, url: impl Into<String>, options: RequestOptions) -> PendingRequest<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.request(Method::Patch, url, options)
    }

    pub fn delete<T>(&self, url: impl Into<String>, options: RequestOptions) -> PendingRequest<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.request(Method::Delete, url, options)
    }

    /// Cancels every registered request with `reason`.
    ///
    /// Does not wait for the cancelled requests and does not touch the
    /// registry; each entry leaves when its request settles. Returns the
    /// number of handles signalled.
    pub fn dispose(&self, reason: Option<&str>) -> usize {
        let handles = self.shared.registry.lock().handles();
        for handle in &handles {
            handle.cancel(reason);
        }
        if !handles.is_empty() {
            debug!(
                "disposed {} outstanding request(s): {}",
                handles.len(),
                reason.unwrap_or("no reason")
            );
        }
        handles.len()
    }

    /// Cancels one registered request. Returns `false` if `id` is not
    /// outstanding or was issued with a caller-owned handle.
    pub fn cancel(&self, id: RequestId, reason: Option<&str>) -> bool {
        let handle = self.shared.registry.lock().get(id).cloned();
        match handle {
            Some(handle) => {
                handle.cancel(reason);
                true
            }
            None => false,
        }
    }

    /// Ids of registered requests that have not settled, oldest first.
    pub fn in_flight(&self) -> Vec<RequestId> {
        self.shared.registry.lock().ids()
    }

    pub fn is_registered(&self, id: RequestId) -> bool {
        self.shared.registry.lock().contains(id)
    }
}

fn settle<T: DeserializeOwned>(
    id: RequestId,
    result: Result<TransportResponse, TransportError>,
) -> Result<T, ClientError> {
    let response = result.map_err(|err| {
        warn!("request {id} failed: {err}");
        ClientError::from(err)
    })?;

    match Parsed::from_body(response.json_or_text()) {
        Parsed::Success(data) => serde_json::from_value(data).map_err(ClientError::Decode),
        Parsed::Failure(code) => {
            debug!("request {id} answered result {code}");
            Err(ClientError::application(code))
        }
        Parsed::Raw(body) => serde_json::from_value(body).map_err(ClientError::Decode),
    }
}

/// Removes a registry entry when the owning request settles or is dropped.
struct Unregister {
    shared: Arc<Shared>,
    id: RequestId,
    registered: bool,
}

impl Drop for Unregister {
    fn drop(&mut self) {
        if self.registered {
            self.shared.registry.lock().remove(self.id);
        }
    }
}

/// A request that has been registered but not yet settled.
#[must_use = "requests do nothing unless awaited"]
pub struct PendingRequest<T> {
    id: RequestId,
    inner: BoxFuture<'static, Result<T, ClientError>>,
}

impl<T> PendingRequest<T> {
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl<T> Future for PendingRequest<T> {
    type Output = Result<T, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T> std::fmt::Debug for PendingRequest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest").field("id", &self.id).finish()
    }
}
