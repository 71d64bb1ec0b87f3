//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID for every inbound request
//! - Read the inbound body within the configured limit
//! - Describe the outbound request (method, headers, body, credential and
//!   redirect policy) handed to the upstream client
//! - Strip hop-by-hop headers before forwarding

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;
use uuid::Uuid;

use crate::proxy::error::{ProxyError, ProxyResult};

/// Header carrying the request ID, inbound and outbound.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Headers that describe a single hop and are never forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Generates UUID v4 request IDs for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of a request, or "unknown" when the layer did not run.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Whether the outbound request carries the caller's credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    /// Forward `Cookie` and `Authorization`.
    #[default]
    Include,
    /// Strip `Cookie` and `Authorization`.
    Omit,
}

/// How the outbound request treats 3xx responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectPolicy {
    /// Hand redirects back to the caller untouched.
    #[default]
    Manual,
    /// Follow redirects inside the client.
    Follow,
}

/// A fully described request to the upstream.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
    pub credentials: Credentials,
    pub redirect: RedirectPolicy,
}

impl OutboundRequest {
    /// A bodiless request with no headers and default policies.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            credentials: Credentials::default(),
            redirect: RedirectPolicy::default(),
        }
    }

    /// Forward an inbound request: original method and headers, credentials
    /// included, redirects surfaced to the caller.
    pub fn forwarding(method: Method, url: Url, inbound: &HeaderMap, body: Option<String>) -> Self {
        Self {
            headers: forwarded_headers(inbound),
            body,
            credentials: Credentials::Include,
            redirect: RedirectPolicy::Manual,
            ..Self::new(method, url)
        }
    }

    /// Headers as they go on the wire after the credential policy is applied.
    pub fn effective_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        if self.credentials == Credentials::Omit {
            headers.remove(header::COOKIE);
            headers.remove(header::AUTHORIZATION);
        }
        headers
    }
}

/// Headers the client recomputes for the target.
const RECOMPUTED: [HeaderName; 3] = [header::HOST, header::CONTENT_LENGTH, header::ACCEPT_ENCODING];

/// Copy inbound headers minus hop-by-hop ones, `Host`, `Content-Length` and
/// `Accept-Encoding`.
///
/// Bodies are re-parsed or re-framed here, so the upstream must answer uncompressed.
pub fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound.iter() {
        if RECOMPUTED.contains(name) || HOP_BY_HOP.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Read the whole inbound body as text, bounded by `limit` bytes.
pub async fn read_body_text(headers: &HeaderMap, body: Body, limit: usize) -> ProxyResult<String> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(ProxyError::PayloadTooLarge { limit });
    }

    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| ProxyError::RequestBody(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
