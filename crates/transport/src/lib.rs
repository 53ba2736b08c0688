//! HTTP transport seam for the JSON API client.
//!
//! A [`Transport`] turns one fully-merged [`TransportRequest`] into a
//! [`TransportResponse`] or a [`TransportError`]. Two implementations ship here:
//! - [`HttpTransport`] over `reqwest`
//! - [`MemoryTransport`] with canned routes, for tests and offline use
//!
//! Dropping the future returned by [`Transport::send`] abandons the call; that
//! is the only cancellation primitive a transport has to honor.

pub mod error;
pub mod http;
pub mod memory;
pub mod request;

pub use error::*;
pub use http::*;
pub use memory::*;
pub use request::*;

use std::future::Future;
use std::pin::Pin;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that can carry a request to a remote endpoint.
///
/// Methods return boxed futures for dyn-compatibility.
pub trait Transport: Send + Sync {
    fn send(&self, request: TransportRequest)
    -> BoxFuture<'_, Result<TransportResponse, TransportError>>;
}
