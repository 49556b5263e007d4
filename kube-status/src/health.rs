//! Health check handlers

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::service::Service;

/// Query string of the readiness endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ReadinessQuery {
    /// Comma separated instance IDs already visited, oldest first
    #[serde(default)]
    pub uuids: Option<String>,
}

impl ReadinessQuery {
    /// Parse the identifier chain, dropping blank entries
    pub fn chain(&self) -> Vec<String> {
        self.uuids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|uuid| !uuid.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Liveness probe
///
/// Returns 200 OK while the serving loop runs and the local health check
/// passes, 503 Service Unavailable otherwise. The body is always a
/// [`Status`](crate::status::Status).
pub async fn healthz(State(service): State<Service>) -> impl IntoResponse {
    let status = service.health().await;
    (status.status_code(), Json(status))
}

/// Readiness probe with dependency propagation
///
/// Returns 200 OK if this service and all of its dependencies are ready,
/// 503 Service Unavailable if any is not, and 508 Loop Detected when the
/// `uuids` chain shows a dependency cycle.
pub async fn readiness(
    State(service): State<Service>,
    Query(query): Query<ReadinessQuery>,
) -> impl IntoResponse {
    let status = service.readiness(&query.chain()).await;
    (status.status_code(), Json(status))
}
