//! The upstream origin and target URL construction.

use std::fmt;
use std::str::FromStr;

use axum::http::Uri;
use url::Url;

use crate::proxy::error::{ProxyError, ProxyResult};

/// Scheme and authority of the single upstream.
///
/// Fixed for the lifetime of the process; only path and query vary per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Serialized origin without a trailing slash.
    base: String,
}

impl Origin {
    /// Parse an origin such as `https://api.example.com` or `http://127.0.0.1:3000/`.
    pub fn parse(origin: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(origin)?;
        if url.host_str().is_none() {
            return Err(url::ParseError::EmptyHost);
        }
        Ok(Self {
            base: url.origin().ascii_serialization(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// Target URL for an inbound request: origin + path + query.
    ///
    /// The query is appended only when non-empty, so `/x?` maps to `/x`.
    pub fn target_for(&self, uri: &Uri) -> ProxyResult<Url> {
        let mut target = format!("{}{}", self.base, uri.path());
        if let Some(query) = uri.query().filter(|q| !q.is_empty()) {
            target.push('?');
            target.push_str(query);
        }

        Url::parse(&target).map_err(|e| ProxyError::InvalidTarget {
            target,
            reason: e.to_string(),
        })
    }
}

impl FromStr for Origin {
    type Err = url::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}
