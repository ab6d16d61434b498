//! Runtime-level metric collectors.
//!
//! Collectors publish gauges that are sampled rather than incremented: they
//! run on scrape and on upkeep, never on the request path.
//!
//! # Metrics
//! - `process_resident_memory_bytes` (gauge)
//! - `process_virtual_memory_bytes` (gauge)
//! - `process_cpu_usage_percent` (gauge): usage since the previous sample
//! - `process_start_time_seconds` (gauge): unix time
//! - `process_uptime_seconds` (gauge)
//! - `process_open_fds` (gauge, Linux only)
//! - `tokio_runtime_workers` (gauge)
//! - `tokio_runtime_alive_tasks` (gauge)
//! - `users_api_build_info` (gauge, always 1, labelled with `version`)

use metrics::{describe_gauge, gauge, Unit};
use parking_lot::Mutex;
use sysinfo::System;
use thiserror::Error;

/// Error raised when a collector cannot take a sample.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("current process id unavailable: {0}")]
    Pid(&'static str),

    #[error("process {0} is not visible to the system probe")]
    ProcessNotFound(u32),

    #[error("no tokio runtime in the current context")]
    NoRuntime,
}

/// A source of sampled metrics.
pub trait Collector: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Register metric descriptions with the installed recorder.
    fn describe(&self);

    /// Take a sample and publish it.
    fn collect(&self) -> Result<(), CollectError>;
}

/// The fixed set of collectors registered at startup.
pub fn default_collectors() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(ProcessCollector::new()),
        Box::new(RuntimeCollector),
        Box::new(BuildInfoCollector),
    ]
}

/// Memory, CPU, start time and file descriptors of the current process.
pub struct ProcessCollector {
    system: Mutex<System>,
}

impl ProcessCollector {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for ProcessCollector {
    fn name(&self) -> &'static str {
        "process"
    }

    fn describe(&self) {
        describe_gauge!(
            "process_resident_memory_bytes",
            Unit::Bytes,
            "Resident memory size of the process"
        );
        describe_gauge!(
            "process_virtual_memory_bytes",
            Unit::Bytes,
            "Virtual memory size of the process"
        );
        describe_gauge!(
            "process_cpu_usage_percent",
            Unit::Percent,
            "CPU usage of the process since the previous sample"
        );
        describe_gauge!(
            "process_start_time_seconds",
            Unit::Seconds,
            "Start time of the process since unix epoch"
        );
        describe_gauge!(
            "process_uptime_seconds",
            Unit::Seconds,
            "Time since the process started"
        );
        #[cfg(target_os = "linux")]
        describe_gauge!("process_open_fds", "Number of open file descriptors");
    }

    fn collect(&self) -> Result<(), CollectError> {
        let pid = sysinfo::get_current_pid().map_err(CollectError::Pid)?;

        let mut system = self.system.lock();
        if !system.refresh_process(pid) {
            return Err(CollectError::ProcessNotFound(pid.as_u32()));
        }
        let process = system
            .process(pid)
            .ok_or(CollectError::ProcessNotFound(pid.as_u32()))?;

        gauge!("process_resident_memory_bytes").set(process.memory() as f64);
        gauge!("process_virtual_memory_bytes").set(process.virtual_memory() as f64);
        gauge!("process_cpu_usage_percent").set(f64::from(process.cpu_usage()));
        gauge!("process_start_time_seconds").set(process.start_time() as f64);
        gauge!("process_uptime_seconds").set(process.run_time() as f64);

        publish_open_fds();

        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn publish_open_fds() {
    if let Ok(entries) = std::fs::read_dir("/proc/self/fd") {
        gauge!("process_open_fds").set(entries.count() as f64);
    }
}

#[cfg(not(target_os = "linux"))]
fn publish_open_fds() {}

/// Worker and task counts of the Tokio runtime driving the server.
pub struct RuntimeCollector;

impl Collector for RuntimeCollector {
    fn name(&self) -> &'static str {
        "tokio_runtime"
    }

    fn describe(&self) {
        describe_gauge!("tokio_runtime_workers", "Number of runtime worker threads");
        describe_gauge!("tokio_runtime_alive_tasks", "Number of alive tasks in the runtime");
    }

    fn collect(&self) -> Result<(), CollectError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| CollectError::NoRuntime)?;
        let runtime = handle.metrics();

        gauge!("tokio_runtime_workers").set(runtime.num_workers() as f64);
        gauge!("tokio_runtime_alive_tasks").set(runtime.num_alive_tasks() as f64);
        Ok(())
    }
}

/// Constant gauge carrying the crate version as a label.
pub struct BuildInfoCollector;

impl Collector for BuildInfoCollector {
    fn name(&self) -> &'static str {
        "build_info"
    }

    fn describe(&self) {
        describe_gauge!("users_api_build_info", "Build information, value is always 1");
    }

    fn collect(&self) -> Result<(), CollectError> {
        gauge!("users_api_build_info", "version" => crate::VERSION).set(1.0);
        Ok(())
    }
}
