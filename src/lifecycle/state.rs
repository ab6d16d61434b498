//! Process lifecycle state machine.
//!
//! # States
//! ```text
//! NotStarted → MetricsInitialized → Serving → Terminated
//! ```
//!
//! Transitions are linear and irreversible: each phase may only advance to
//! the next one.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Lifecycle phase of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Phase {
    NotStarted = 0,
    MetricsInitialized = 1,
    Serving = 2,
    Terminated = 3,
}

impl Phase {
    fn from_u8(value: u8) -> Phase {
        match value {
            0 => Phase::NotStarted,
            1 => Phase::MetricsInitialized,
            2 => Phase::Serving,
            _ => Phase::Terminated,
        }
    }

    /// The only phase this one may advance to.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::NotStarted => Some(Phase::MetricsInitialized),
            Phase::MetricsInitialized => Some(Phase::Serving),
            Phase::Serving => Some(Phase::Terminated),
            Phase::Terminated => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::NotStarted => "not_started",
            Phase::MetricsInitialized => "metrics_initialized",
            Phase::Serving => "serving",
            Phase::Terminated => "terminated",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid lifecycle transition {from} -> {to}")]
pub struct LifecycleError {
    pub from: Phase,
    pub to: Phase,
}

/// Shared handle to the current phase.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    phase: Arc<AtomicU8>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Arc::new(AtomicU8::new(Phase::NotStarted as u8)),
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn is_serving(&self) -> bool {
        self.phase() == Phase::Serving
    }

    /// Advance to `to`, which must be the successor of the current phase.
    pub fn advance(&self, to: Phase) -> Result<(), LifecycleError> {
        let from = self.phase();
        if from.next() != Some(to) {
            return Err(LifecycleError { from, to });
        }

        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|current| LifecycleError {
                from: Phase::from_u8(current),
                to,
            })?;

        tracing::info!(from = %from, to = %to, "Lifecycle phase changed");
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
