//! Proxy subsystem: the request handler and its error type.

pub mod error;
pub mod handler;

pub use error::{ProxyError, ProxyResult};
pub use handler::ProxyHandler;
