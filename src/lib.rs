//! Users API service bootstrap.
//!
//! Starts an HTTP server with Prometheus metrics enabled: process and runtime
//! collectors are registered first, then the server binds and every request
//! is timed.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{Application, Lifecycle, Phase, RunningApplication, Shutdown, StartupError};
pub use observability::MetricsRegistry;

/// Crate version reported by `/info` and the build-info gauge.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
