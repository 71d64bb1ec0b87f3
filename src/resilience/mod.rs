//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → retries.rs (send, retry transport failures)
//!     → backoff.rs (delay between attempts: base * 2^(n-1), capped)
//! ```
//!
//! Per-attempt deadlines live in the upstream client; the whole-request
//! deadline is enforced by the proxy handler.

pub mod backoff;
pub mod retries;

pub use retries::{fetch_with_retry, RetryPolicy};
