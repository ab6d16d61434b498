//! Startup orchestration.
//!
//! # Responsibilities
//! - Install metrics and register collectors
//! - Bind the listener and begin accepting traffic
//! - Start background tasks (metrics upkeep)
//! - Hand back a running application that can be stopped or awaited
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and the phase never reaches `Serving`
//! - Subsystems initialize in order, not concurrently
//! - Metrics are registered before the listener exists

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::ServiceConfig;
use crate::http::{AppState, HttpServer, ServeError};
use crate::lifecycle::signals::shutdown_signal;
use crate::lifecycle::state::{Lifecycle, LifecycleError, Phase};
use crate::lifecycle::Shutdown;
use crate::net::{self, ListenerError};
use crate::observability::{default_collectors, Collector, MetricsError, MetricsRegistry};

/// Error that prevents the service from reaching `Serving`.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("metrics initialization failed: {0}")]
    Metrics(#[from] MetricsError),

    #[error("listener setup failed: {0}")]
    Bind(#[from] ListenerError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// An application that has not started yet.
pub struct Application {
    config: ServiceConfig,
    routes: Router,
    collectors: Vec<Box<dyn Collector>>,
    lifecycle: Lifecycle,
}

impl Application {
    /// Create an application with no collectors and no extra routes.
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            routes: Router::new(),
            collectors: Vec::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Register the standard process, runtime and build-info collectors.
    pub fn with_default_collectors(mut self) -> Self {
        self.collectors.extend(default_collectors());
        self
    }

    /// Register an additional collector.
    pub fn with_collector(mut self, collector: impl Collector + 'static) -> Self {
        self.collectors.push(Box::new(collector));
        self
    }

    /// Register routes; they are instrumented like the built-in ones.
    pub fn with_routes(mut self, routes: Router) -> Self {
        self.routes = self.routes.merge(routes);
        self
    }

    /// Handle to the lifecycle phase, valid before and after `start`.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.clone()
    }

    /// Run the startup sequence.
    pub async fn start(self) -> Result<RunningApplication, StartupError> {
        let Application {
            config,
            routes,
            collectors,
            lifecycle,
        } = self;

        // 1. Metrics before anything can accept traffic
        let registry = MetricsRegistry::install(collectors)?;
        lifecycle.advance(Phase::MetricsInitialized)?;

        // 2. Bind (fail fast, no retry)
        let (listener, local_addr) = net::bind(&config.listener).await?;

        // 3. Application context
        let state = AppState {
            registry: registry.clone(),
            lifecycle: lifecycle.clone(),
            service_name: Arc::from(config.service.name.as_str()),
        };
        let server = HttpServer::new(&config, state, routes);

        let shutdown = Shutdown::new();
        let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
        let server_task = tokio::spawn(server.run(listener, &shutdown, grace));

        // 4. Background upkeep
        let upkeep_task = registry.spawn_upkeep(
            Duration::from_secs(config.observability.upkeep_interval_secs),
            shutdown.subscribe(),
        );

        // 5. Serving
        if let Err(e) = lifecycle.advance(Phase::Serving) {
            stop_spawned(&shutdown, server_task, upkeep_task).await;
            return Err(e.into());
        }
        tracing::info!(
            service = %config.service.name,
            address = %local_addr,
            metrics_path = %config.observability.metrics_path,
            collectors = ?registry.collector_names(),
            "ready"
        );

        Ok(RunningApplication {
            local_addr,
            registry,
            lifecycle,
            shutdown,
            server_task,
            upkeep_task,
        })
    }
}

/// Stop tasks spawned by a startup that cannot complete, releasing the listener.
async fn stop_spawned(
    shutdown: &Shutdown,
    server_task: JoinHandle<Result<(), ServeError>>,
    upkeep_task: JoinHandle<()>,
) {
    shutdown.trigger();
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Server stopped with error during aborted startup")
        }
        Err(e) => tracing::warn!(error = %e, "Server task failed during aborted startup"),
    }
    if let Err(e) = upkeep_task.await {
        tracing::warn!(error = %e, "Metrics upkeep task failed");
    }
}

/// A serving application.
pub struct RunningApplication {
    local_addr: SocketAddr,
    registry: MetricsRegistry,
    lifecycle: Lifecycle,
    shutdown: Shutdown,
    server_task: JoinHandle<Result<(), ServeError>>,
    upkeep_task: JoinHandle<()>,
}

impl RunningApplication {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.clone()
    }

    /// Handle that triggers a graceful shutdown when fired.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Wait until the server exits, then flush metrics and terminate.
    pub async fn wait(self) -> Result<(), ServeError> {
        let outcome = match self.server_task.await {
            Ok(result) => result,
            Err(e) => Err(ServeError::Join(e)),
        };

        // The server is gone either way; stop upkeep too.
        self.shutdown.trigger();
        if let Err(e) = self.upkeep_task.await {
            tracing::warn!(error = %e, "Metrics upkeep task failed");
        }
        self.registry.flush();

        if let Err(e) = self.lifecycle.advance(Phase::Terminated) {
            tracing::warn!(error = %e, "Unexpected lifecycle state at shutdown");
        }

        match &outcome {
            Ok(()) => tracing::info!("Shutdown complete"),
            Err(e) => tracing::error!(error = %e, "Server terminated with error"),
        }
        outcome
    }

    /// Trigger a graceful shutdown and wait for it.
    pub async fn stop(self) -> Result<(), ServeError> {
        self.shutdown.trigger();
        self.wait().await
    }

    /// Serve until SIGINT or SIGTERM, then shut down gracefully.
    pub async fn run_until_signal(self) -> Result<(), ServeError> {
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.trigger();
        });
        self.wait().await
    }
}
