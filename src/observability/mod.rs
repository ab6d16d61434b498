//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms via the global recorder)
//!     → collectors.rs (sampled process/runtime gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - The recorder is installed once, before the listener is bound
//! - Metrics are cheap on the request path (atomic increments)
//! - Sampled gauges are refreshed on scrape and upkeep only

pub mod collectors;
pub mod logging;
pub mod metrics;

pub use collectors::{default_collectors, CollectError, Collector};
pub use logging::{init_logging, LoggingError};
pub use metrics::{MetricsError, MetricsRegistry};
