//! Observability subsystem.
//!
//! Structured logs only, via `tracing`. The request ID set by the HTTP layer
//! is echoed to the client, forwarded upstream and attached to handler logs.

pub mod logging;

pub use logging::init_logging;
