//! Edge CORS Proxy Library
//!
//! Forwards every request to one upstream origin, retries transport
//! failures with exponential backoff, and rewrites response headers so
//! browsers on any origin can read the result.
//!
//! ```text
//! client → http::server → proxy::handler ─┬─ OPTIONS → 204 preflight
//!                                          └─ resilience::retries → upstream::client → origin
//!        ← http::response (CORS + Set-Cookie, 302 / passthrough / JSON) ←┘
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{ProxyError, ProxyHandler};
