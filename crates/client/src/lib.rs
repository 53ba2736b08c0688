//! Cancellable JSON API client.
//!
//! [`Client`] assigns every request a monotonically increasing [`RequestId`],
//! tracks a [`CancelHandle`] per outstanding request and cancels them all on
//! [`Client::dispose`]. Responses wrapped in the `{ result, data }` envelope are
//! unwrapped (`result == -1` is success); anything else passes through.
//!
//! [`ClientScope`] and [`Resource`] tie a client to the lifetime of whatever
//! owns it.

pub mod cancel;
pub mod client;
pub mod envelope;
pub mod error;
pub mod options;
pub mod registry;
pub mod resource;
pub mod scope;

pub use cancel::*;
pub use client::*;
pub use envelope::*;
pub use error::*;
pub use options::*;
pub use registry::RequestId;
pub use resource::*;
pub use scope::*;

pub use transport::{Method, TransportConfig};
