//! Users API bootstrap binary.
//!
//! # Startup Sequence
//!
//! ```text
//!   resolve config ──▶ init logging ──▶ install metrics ──▶ bind ──▶ serve
//!   (file/env/CLI)     (tracing)        (collectors)        (fail       │
//!                                                            fast)      ▼
//!                                               SIGINT/SIGTERM ──▶ drain ──▶ exit
//! ```
//!
//! Any failure before `ready` is logged and the process exits non-zero.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use users_api::config::{self, Overrides};
use users_api::observability::init_logging;
use users_api::Application;

#[derive(Parser)]
#[command(name = "users-api")]
#[command(version, about = "Users API service with Prometheus metrics", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long, env = "USERS_API_CONFIG")]
    config: Option<PathBuf>,

    /// Override listener.bind_address (e.g. 0.0.0.0:8083)
    #[arg(long)]
    bind: Option<String>,

    /// Override observability.log_level (e.g. debug or users_api=trace)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let overrides = Overrides {
        bind_address: cli.bind,
        log_level: cli.log_level,
    };
    let config = match config::resolve(cli.config.as_deref(), overrides, |key| {
        std::env::var(key).ok()
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("users-api: configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("users-api: logging setup failed: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        version = users_api::VERSION,
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "users-api starting"
    );

    let running = match Application::new(config)
        .with_default_collectors()
        .start()
        .await
    {
        Ok(running) => running,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("users-api: startup failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    match running.run_until_signal().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("users-api: server error: {e}");
            ExitCode::FAILURE
        }
    }
}
