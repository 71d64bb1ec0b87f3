//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, body read, outbound request)
//!     → [proxy handler forwards upstream]
//!     → response.rs (CORS, cookies, response shape)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{Credentials, OutboundRequest, RedirectPolicy, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
