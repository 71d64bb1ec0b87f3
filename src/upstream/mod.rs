//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! inbound path + query
//!     → origin.rs (fixed origin + path + query = target URL)
//!     → client.rs (one outbound attempt, transport errors typed)
//! ```

pub mod client;
pub mod origin;

pub use client::{Fetch, TransportError, UpstreamClient};
pub use origin::Origin;
