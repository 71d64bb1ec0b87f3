//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. Returns every error found,
//! not just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{ProxyConfig, RetryConfig};
use crate::resilience::backoff::calculate_backoff;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("listener.max_body_bytes must be greater than 0")]
    ZeroBodyLimit,

    #[error("upstream.origin '{origin}' is invalid: {reason}")]
    Origin { origin: String, reason: String },

    #[error("retries.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("retries.base_delay_ms ({base}) exceeds retries.max_delay_ms ({max})")]
    DelayRange { base: u64, max: u64 },

    #[error("timeouts.{0} must be greater than 0")]
    ZeroTimeout(&'static str),

    #[error(
        "timeouts.request_secs ({request_secs}) must exceed the {needed_ms} ms \
         that every upstream attempt and backoff delay can take"
    )]
    DeadlineTooShort { request_secs: u64, needed_ms: u64 },
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if let Err(reason) = check_origin(&config.upstream.origin) {
        errors.push(ValidationError::Origin {
            origin: config.upstream.origin.clone(),
            reason,
        });
    }

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts);
    }
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::DelayRange {
            base: retries.base_delay_ms,
            max: retries.max_delay_ms,
        });
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("connect_secs", timeouts.connect_secs),
        ("upstream_secs", timeouts.upstream_secs),
        ("request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    if retries.max_attempts > 0 && timeouts.upstream_secs > 0 && timeouts.request_secs > 0 {
        let needed_ms = retry_budget_ms(retries, timeouts.upstream_secs);
        if timeouts.request_secs.saturating_mul(1000) <= needed_ms {
            errors.push(ValidationError::DeadlineTooShort {
                request_secs: timeouts.request_secs,
                needed_ms,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Worst case for the retry loop: every attempt runs to `upstream_secs` and
/// every backoff delay carries its full jitter.
fn retry_budget_ms(retries: &RetryConfig, upstream_secs: u64) -> u64 {
    let attempts = u64::from(retries.max_attempts);
    let mut total = attempts.saturating_mul(upstream_secs.saturating_mul(1000));

    for failure in 1..retries.max_attempts {
        let delay = calculate_backoff(failure, retries.base_delay_ms, retries.max_delay_ms, false);
        let mut delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let capped = delay_ms == 0 || delay_ms >= retries.max_delay_ms;
        if retries.jitter {
            delay_ms = delay_ms.saturating_add(delay_ms / 10);
        }
        if capped {
            // Delays stop growing from here on.
            let remaining = u64::from(retries.max_attempts - failure);
            return total.saturating_add(delay_ms.saturating_mul(remaining));
        }
        total = total.saturating_add(delay_ms);
    }
    total
}

fn check_origin(origin: &str) -> Result<(), String> {
    let url = Url::parse(origin).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err("origin must not carry a path, query or fragment".to_string());
    }
    Ok(())
}
