//! Configuration loading from disk and the environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{LogFormat, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Port-only override of the bind address.
pub const ENV_SERVER_PORT: &str = "SERVER_PORT";
pub const ENV_BIND_ADDRESS: &str = "USERS_API_BIND_ADDRESS";
pub const ENV_LOG_LEVEL: &str = "USERS_API_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "USERS_API_LOG_FORMAT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidOverride {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Overrides taken from the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
}

/// Parse a TOML configuration file. Missing sections fall back to defaults.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: ServiceConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(address) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = address;
    }

    if let Some(port) = lookup(ENV_SERVER_PORT) {
        config.listener.bind_address = replace_port(&config.listener.bind_address, &port)?;
    }

    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.observability.log_level = level;
    }

    if let Some(format) = lookup(ENV_LOG_FORMAT) {
        config.observability.log_format =
            format
                .parse::<LogFormat>()
                .map_err(|reason| ConfigError::InvalidOverride {
                    name: ENV_LOG_FORMAT,
                    value: format.clone(),
                    reason,
                })?;
    }

    Ok(())
}

fn replace_port(bind_address: &str, port: &str) -> Result<String, ConfigError> {
    let port: u16 = port.trim().parse().map_err(|e: std::num::ParseIntError| {
        ConfigError::InvalidOverride {
            name: ENV_SERVER_PORT,
            value: port.to_string(),
            reason: e.to_string(),
        }
    })?;

    let mut addr: SocketAddr =
        bind_address
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidOverride {
                name: ENV_SERVER_PORT,
                value: bind_address.to_string(),
                reason: format!("bind address does not parse: {}", e),
            })?;
    addr.set_port(port);
    Ok(addr.to_string())
}

/// Resolve the effective configuration: defaults or file, then environment,
/// then command-line overrides, then validation.
pub fn resolve<F>(
    path: Option<&Path>,
    overrides: Overrides,
    lookup: F,
) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, lookup)?;

    if let Some(address) = overrides.bind_address {
        config.listener.bind_address = address;
    }
    if let Some(level) = overrides.log_level {
        config.observability.log_level = level;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
