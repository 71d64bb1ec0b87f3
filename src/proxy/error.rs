//! Proxy error taxonomy.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Result alias for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Errors raised while forwarding a single request.
///
/// Every variant is turned into a plain-text `Error: <message>` response;
/// none of them is fatal to the process.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Every attempt failed at the transport level.
    #[error("Failed to fetch after {attempts} attempts: {message}")]
    RetryExhausted { attempts: u32, message: String },

    /// The retry loop ran zero times.
    #[error("Failed to fetch after retrying")]
    RetryLoopExhausted,

    /// The upstream body was not valid JSON.
    #[error("Invalid JSON from upstream: {0}")]
    BodyParse(#[source] serde_json::Error),

    /// The upstream body could not be read to completion.
    #[error("Failed to read upstream body: {0}")]
    UpstreamBody(String),

    /// Origin plus inbound path and query did not form a URL.
    #[error("Invalid target URL '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// The inbound body declared a length above the configured limit.
    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The inbound body could not be read.
    #[error("Failed to read request body: {0}")]
    RequestBody(String),

    /// The request, retries included, outlived its deadline.
    #[error("Request timed out after {secs} seconds")]
    DeadlineExceeded { secs: u64 },
}

impl ProxyError {
    /// The status code this error carries, 500 when it carries none.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::RequestBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("Error: {}", self),
        )
            .into_response()
    }
}
