//! Operational handlers.
//!
//! - `/metrics`: Prometheus scrape endpoint (path configurable)
//! - `/health`: liveness, returns OK while the process runs
//! - `/ready`: readiness, 200 only in the `Serving` phase
//! - `/info`: service name and version

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::http::server::AppState;

/// Content type of the Prometheus text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub name: String,
    pub version: &'static str,
}

/// Render the current registry.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.registry.render(),
    )
}

/// Liveness probe. Does not check anything beyond the process answering.
pub async fn health() -> &'static str {
    "OK"
}

/// Readiness probe.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let phase = state.lifecycle.phase();
    let status = if state.lifecycle.is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            status: phase.as_str(),
        }),
    )
}

pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: state.service_name.to_string(),
        version: crate::VERSION,
    })
}
