//! Request timing middleware.
//!
//! Wraps every route of the assembled router, including the fallback, and
//! records count and latency labelled by method, matched route template and
//! response status. It sits outside the timeout and body-limit layers, so
//! 408 and 413 responses are recorded under the route they were aimed at.
//! The scrape endpoint is passed through untimed.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::observability::metrics::{record_http_request, UNMATCHED_ROUTE};

/// Route the timing middleware leaves alone.
#[derive(Debug, Clone)]
pub struct UntimedPath(pub Arc<str>);

impl UntimedPath {
    pub fn new(path: &str) -> Self {
        Self(Arc::from(path))
    }
}

/// Middleware that records HTTP request metrics for all responses.
pub async fn track_http_metrics(
    State(untimed): State<UntimedPath>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string());

    if route.as_deref() == Some(&*untimed.0) {
        return next.run(request).await;
    }

    let start = Instant::now();
    let method = request.method().to_string();
    let route = route.unwrap_or_else(|| UNMATCHED_ROUTE.to_string());

    let response = next.run(request).await;

    record_http_request(&method, &route, response.status().as_u16(), start.elapsed());

    response
}
