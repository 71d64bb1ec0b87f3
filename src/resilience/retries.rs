//! Retrying fetcher.
//!
//! Only transport failures are retried. Any HTTP response, 4xx and 5xx
//! included, ends the loop and is returned to the caller, so a POST the
//! upstream rejected is never replayed.

use std::time::Duration;

use axum::http::StatusCode;

use crate::config::RetryConfig;
use crate::http::request::OutboundRequest;
use crate::proxy::error::{ProxyError, ProxyResult};
use crate::resilience::backoff::calculate_backoff;
use crate::upstream::Fetch;

/// Attempt limit and backoff settings for one call to [`fetch_with_retry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            jitter: config.jitter,
        }
    }

    /// Sleep before the next attempt, after `failures` failed attempts.
    pub fn delay_after(&self, failures: u32) -> Duration {
        calculate_backoff(failures, self.base_delay_ms, self.max_delay_ms, self.jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Send `request`, retrying transport failures with exponential backoff.
///
/// Returns the first response the upstream produces. After `max_attempts`
/// transport failures returns [`ProxyError::RetryExhausted`] carrying the last
/// failure's message.
pub async fn fetch_with_retry<F: Fetch>(
    fetcher: &F,
    request: &OutboundRequest,
    policy: &RetryPolicy,
) -> ProxyResult<reqwest::Response> {
    let mut attempt = 0;

    while attempt < policy.max_attempts {
        match fetcher.fetch(request).await {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() && status != StatusCode::FOUND {
                    tracing::debug!(
                        target_url = %request.url,
                        status = %status,
                        "Passing through upstream status"
                    );
                }
                return Ok(response);
            }
            Err(e) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    tracing::error!(
                        target_url = %request.url,
                        attempts = attempt,
                        error = %e,
                        "Upstream unreachable, giving up"
                    );
                    return Err(ProxyError::RetryExhausted {
                        attempts: policy.max_attempts,
                        message: e.message,
                    });
                }

                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    target_url = %request.url,
                    attempt = attempt,
                    delay = ?delay,
                    error = %e,
                    "Retrying after network error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    Err(ProxyError::RetryLoopExhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::TransportError;
    use axum::http::Method;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;
    use url::Url;

    /// Replays scripted outcomes and records when each attempt happened.
    struct Scripted {
        outcomes: Mutex<VecDeque<Result<u16, &'static str>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<u16, &'static str>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Fetch for Scripted {
        async fn fetch(&self, _request: &OutboundRequest) -> Result<reqwest::Response, TransportError> {
            self.calls.lock().unwrap().push(Instant::now());
            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err("script exhausted"));
            match outcome {
                Ok(status) => {
                    let response = axum::http::Response::builder()
                        .status(status)
                        .body("")
                        .unwrap();
                    Ok(reqwest::Response::from(response))
                }
                Err(message) => Err(TransportError::new(message)),
            }
        }
    }

    fn request() -> OutboundRequest {
        OutboundRequest::new(Method::GET, Url::parse("http://upstream.test/api").unwrap())
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            ..RetryPolicy::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_returns_on_first_attempt_without_delay() {
        let fetcher = Scripted::new(vec![Ok(200)]);
        let start = Instant::now();

        let response = fetch_with_retry(&fetcher, &request(), &policy(2)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fetcher.calls().len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn found_is_returned_as_is() {
        let fetcher = Scripted::new(vec![Ok(302)]);
        let response = fetch_with_retry(&fetcher, &request(), &policy(2)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn error_statuses_are_not_retried() {
        for status in [404, 500, 503] {
            let fetcher = Scripted::new(vec![Ok(status), Ok(200)]);
            let response = fetch_with_retry(&fetcher, &request(), &policy(3)).await.unwrap();
            assert_eq!(response.status().as_u16(), status);
            assert_eq!(fetcher.calls().len(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_then_success() {
        let fetcher = Scripted::new(vec![Err("connection refused"), Ok(201)]);
        let start = Instant::now();

        let response = fetch_with_retry(&fetcher, &request(), &policy(2)).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let calls = fetcher.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1] - start, Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_attempts_with_doubling_delays() {
        let fetcher = Scripted::new(vec![Err("dns"), Err("reset"), Err("refused"), Err("timeout")]);
        let start = Instant::now();

        let err = fetch_with_retry(&fetcher, &request(), &policy(4)).await.unwrap_err();

        let calls = fetcher.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0] - start, Duration::ZERO);
        assert_eq!(calls[1] - calls[0], Duration::from_millis(1000));
        assert_eq!(calls[2] - calls[1], Duration::from_millis(2000));
        assert_eq!(calls[3] - calls[2], Duration::from_millis(4000));
        // No sleep after the final failure.
        assert_eq!(start.elapsed(), Duration::from_millis(7000));

        match err {
            ProxyError::RetryExhausted { attempts, message } => {
                assert_eq!(attempts, 4);
                assert_eq!(message, "timeout");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn default_policy_message() {
        let fetcher = Scripted::new(vec![Err("refused"), Err("refused")]);
        let err = fetch_with_retry(&fetcher, &request(), &RetryPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch after 2 attempts: refused");
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_hits_loop_fallback() {
        let fetcher = Scripted::new(vec![Ok(200)]);
        let err = fetch_with_retry(&fetcher, &request(), &policy(0)).await.unwrap_err();
        assert!(matches!(err, ProxyError::RetryLoopExhausted));
        assert!(fetcher.calls().is_empty());
    }
}
