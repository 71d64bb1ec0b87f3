//! Outbound HTTP client.
//!
//! # Responsibilities
//! - Send one attempt of an [`OutboundRequest`] to the upstream
//! - Apply the request's redirect and credential policy
//! - Report transport failures (connect, DNS, TLS, timeout) as [`TransportError`]
//!
//! HTTP error statuses are not failures here; they come back as responses.

use std::error::Error as StdError;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::redirect::Policy;
use thiserror::Error;

use crate::config::TimeoutConfig;
use crate::http::request::{OutboundRequest, RedirectPolicy};

/// A failure below HTTP: the upstream produced no response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest's top-level message hides the cause; keep the whole chain.
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self { message }
    }
}

/// Performs a single outbound attempt.
pub trait Fetch: Send + Sync {
    fn fetch(
        &self,
        request: &OutboundRequest,
    ) -> impl Future<Output = Result<reqwest::Response, TransportError>> + Send;
}

/// reqwest-backed upstream client.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    timeouts: TimeoutConfig,
    /// Redirects disabled: 3xx responses are returned as-is.
    manual: reqwest::Client,
    /// reqwest's default redirect policy, built on first use.
    follow: OnceLock<reqwest::Client>,
}

impl UpstreamClient {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            timeouts: timeouts.clone(),
            manual: build_client(timeouts, Policy::none())?,
            follow: OnceLock::new(),
        })
    }

    fn follow_client(&self) -> Result<&reqwest::Client, TransportError> {
        if let Some(client) = self.follow.get() {
            return Ok(client);
        }
        let client = build_client(&self.timeouts, Policy::default())?;
        Ok(self.follow.get_or_init(|| client))
    }
}

fn build_client(timeouts: &TimeoutConfig, redirect: Policy) -> Result<reqwest::Client, reqwest::Error> {
    // The origin is reached directly; ambient HTTP(S)_PROXY settings are ignored.
    reqwest::Client::builder()
        .no_proxy()
        .redirect(redirect)
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .timeout(Duration::from_secs(timeouts.upstream_secs))
        .build()
}

impl Fetch for UpstreamClient {
    async fn fetch(&self, request: &OutboundRequest) -> Result<reqwest::Response, TransportError> {
        let client = match request.redirect {
            RedirectPolicy::Manual => &self.manual,
            RedirectPolicy::Follow => self.follow_client()?,
        };

        let mut builder = client
            .request(request.method.clone(), request.url.clone())
            .headers(request.effective_headers());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        builder.send().await.map_err(TransportError::from)
    }
}
