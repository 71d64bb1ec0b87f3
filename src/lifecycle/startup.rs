//! Startup orchestration.
//!
//! Config file (if any) → command-line overrides → validation. Any error is
//! fatal; the listener is bound only after the config is accepted.

use std::path::Path;

use crate::config::loader::{read_config, ConfigError};
use crate::config::validation::validate_config;
use crate::config::ProxyConfig;

/// Values given on the command line, applied over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub upstream_origin: Option<String>,
}

/// Build the effective configuration.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };

    if let Some(bind_address) = overrides.bind_address {
        config.listener.bind_address = bind_address;
    }
    if let Some(origin) = overrides.upstream_origin {
        config.upstream.origin = origin;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
