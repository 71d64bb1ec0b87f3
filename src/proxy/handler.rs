//! Proxy handler.
//!
//! # Request Flow
//! ```text
//! OPTIONS                      → 204 preflight, upstream never contacted
//! otherwise
//!     → target = origin + path + query
//!     → read body (forwarded only for POST)
//!     → fetch_with_retry
//!     → 302                    → 302 + Location, no body
//!     → GET /                  → 200, upstream body streamed untouched
//!     → anything else          → upstream JSON re-serialized, upstream status
//! any error                    → text/plain "Error: <message>"
//! past the deadline            → 504 text/plain "Error: <message>"
//! ```

use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::ext::ReasonPhrase;

use crate::http::request::{read_body_text, request_id, OutboundRequest};
use crate::http::response;
use crate::proxy::error::{ProxyError, ProxyResult};
use crate::resilience::{fetch_with_retry, RetryPolicy};
use crate::upstream::{Fetch, Origin};

/// Forwards requests to a single upstream origin.
pub struct ProxyHandler<F> {
    origin: Origin,
    fetcher: F,
    retry: RetryPolicy,
    max_body_bytes: usize,
    deadline: Option<Duration>,
}

impl<F: Fetch> ProxyHandler<F> {
    pub fn new(origin: Origin, fetcher: F, retry: RetryPolicy, max_body_bytes: usize) -> Self {
        Self {
            origin,
            fetcher,
            retry,
            max_body_bytes,
            deadline: None,
        }
    }

    /// Bound every request, retries and backoff included, by `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Handle one inbound request. Never fails; errors become responses.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        if request.method() == Method::OPTIONS {
            return response::preflight();
        }

        let request_id = request_id(request.headers()).to_string();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let outcome = match self.deadline {
            Some(limit) => tokio::time::timeout(limit, self.forward(request))
                .await
                .unwrap_or_else(|_| Err(ProxyError::DeadlineExceeded { secs: limit.as_secs() })),
            None => self.forward(request).await,
        };

        match outcome {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    error = %e,
                    "Proxy request failed"
                );
                e.into_response()
            }
        }
    }

    async fn forward(&self, request: Request<Body>) -> ProxyResult<Response> {
        let (parts, body) = request.into_parts();
        let target = self.origin.target_for(&parts.uri)?;

        let payload = read_body_text(&parts.headers, body, self.max_body_bytes).await?;
        let body = (parts.method == Method::POST).then_some(payload);

        tracing::debug!(
            request_id = %request_id(&parts.headers),
            method = %parts.method,
            target_url = %target,
            "Proxying request"
        );

        let outbound = OutboundRequest::forwarding(parts.method.clone(), target, &parts.headers, body);
        let upstream = fetch_with_retry(&self.fetcher, &outbound, &self.retry).await?;

        let status = upstream.status();
        tracing::debug!(
            request_id = %request_id(&parts.headers),
            status = %status,
            "Upstream responded"
        );

        let headers = response::rewrite_headers(upstream.headers());

        if status == StatusCode::FOUND {
            return Ok(response::redirect(headers, upstream.headers()));
        }

        if parts.uri.path() == "/" && parts.method == Method::GET {
            return Ok(response::passthrough(headers, upstream));
        }

        let reason = upstream.extensions().get::<ReasonPhrase>().cloned();
        let bytes = upstream
            .bytes()
            .await
            .map_err(|e| ProxyError::UpstreamBody(e.to_string()))?;
        let data: serde_json::Value = serde_json::from_slice(&bytes).map_err(ProxyError::BodyParse)?;
        response::json(status, reason, headers, &data)
    }
}
