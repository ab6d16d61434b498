//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Install metrics → Register collectors → Bind → Serve → ready
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain (bounded) → Flush metrics → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! State (state.rs):
//!     NotStarted → MetricsInitialized → Serving → Terminated
//! ```
//!
//! # Design Decisions
//! - Ordered startup: metrics first, listener last
//! - Ordered shutdown: stop accept, drain, flush
//! - Shutdown has timeout: the server is aborted after the grace period

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use shutdown::Shutdown;
pub use startup::{Application, RunningApplication, StartupError};
pub use state::{Lifecycle, LifecycleError, Phase};
