//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Keep the metrics path from shadowing the operational routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::ServiceConfig;

/// Paths served by the operational handlers.
pub const RESERVED_PATHS: [&str; 3] = ["/health", "/ready", "/info"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service.name must not be empty")]
    EmptyServiceName,

    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("listener.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("observability.upkeep_interval_secs must be greater than zero")]
    ZeroUpkeepInterval,

    #[error("observability.metrics_path '{0}' must start with '/'")]
    RelativeMetricsPath(String),

    #[error("observability.metrics_path '{0}' collides with a built-in route")]
    ReservedMetricsPath(String),

    #[error("observability.metrics_path '{0}' must be a literal path without captures or wildcards")]
    PatternMetricsPath(String),

    #[error("observability.log_level '{0}' is not a valid filter")]
    InvalidLogLevel(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }
    if config.timeouts.shutdown_grace_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("shutdown_grace_secs"));
    }

    let obs = &config.observability;
    if obs.upkeep_interval_secs == 0 {
        errors.push(ValidationError::ZeroUpkeepInterval);
    }

    if !obs.metrics_path.starts_with('/') {
        errors.push(ValidationError::RelativeMetricsPath(obs.metrics_path.clone()));
    } else if RESERVED_PATHS.contains(&obs.metrics_path.as_str()) {
        errors.push(ValidationError::ReservedMetricsPath(obs.metrics_path.clone()));
    } else if !is_literal_route(&obs.metrics_path) {
        errors.push(ValidationError::PatternMetricsPath(obs.metrics_path.clone()));
    }

    if EnvFilter::try_new(&obs.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(obs.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// The router treats `{..}`, `:` and `*` segments as captures and rejects
/// some of them outright, so the scrape route must avoid them.
fn is_literal_route(path: &str) -> bool {
    path.split('/').all(|segment| {
        !segment.starts_with(':')
            && !segment.starts_with('*')
            && !segment.contains(['{', '}'])
    })
}
