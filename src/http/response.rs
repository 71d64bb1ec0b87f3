//! Response handling and transformation.
//!
//! # Responsibilities
//! - Answer CORS preflight requests without contacting the upstream
//! - Build the outbound header set (CORS grants plus upstream cookies)
//! - Shape redirect, passthrough and JSON responses for the client
//!
//! Upstream headers other than `Set-Cookie` and `Location` are dropped.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::ext::ReasonPhrase;

use crate::proxy::error::{ProxyError, ProxyResult};

const ALLOW_ANY_ORIGIN: HeaderValue = HeaderValue::from_static("*");
const ALLOWED_METHODS: HeaderValue = HeaderValue::from_static("GET, POST, OPTIONS");
const ALLOWED_HEADERS: HeaderValue = HeaderValue::from_static("Content-Type, Authorization");
const PREFLIGHT_MAX_AGE: HeaderValue = HeaderValue::from_static("86400");

/// 204 answer to an `OPTIONS` preflight.
pub fn preflight() -> Response {
    let headers = [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ANY_ORIGIN),
        (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS),
        (header::ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE),
    ];
    (StatusCode::NO_CONTENT, headers).into_response()
}

/// Fresh header set for a proxied response.
///
/// Grants any origin with credentials and appends every upstream
/// `Set-Cookie` value, preserving multiple cookies.
pub fn rewrite_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ANY_ORIGIN);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    for cookie in upstream.get_all(header::SET_COOKIE) {
        headers.append(header::SET_COOKIE, cookie.clone());
    }
    headers
}

/// Bodiless 302 carrying the upstream `Location`.
pub fn redirect(mut headers: HeaderMap, upstream: &HeaderMap) -> Response {
    if let Some(location) = upstream.get(header::LOCATION) {
        headers.insert(header::LOCATION, location.clone());
    }
    (StatusCode::FOUND, headers).into_response()
}

/// 200 streaming the upstream body through untouched.
pub fn passthrough(mut headers: HeaderMap, upstream: reqwest::Response) -> Response {
    if let Some(content_type) = upstream.headers().get(header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, content_type.clone());
    }
    let body = Body::from_stream(upstream.bytes_stream());
    (StatusCode::OK, headers, body).into_response()
}

/// Re-serialized JSON under the upstream's status and reason phrase.
///
/// Object keys keep the upstream's order. A non-canonical reason phrase is
/// written back on the status line by the server.
pub fn json(
    status: StatusCode,
    reason: Option<ReasonPhrase>,
    mut headers: HeaderMap,
    data: &serde_json::Value,
) -> ProxyResult<Response> {
    let body = serde_json::to_vec(data).map_err(ProxyError::BodyParse)?;
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let mut response = (status, headers, body).into_response();
    if let Some(reason) = reason {
        response.extensions_mut().insert(reason);
    }
    Ok(response)
}
