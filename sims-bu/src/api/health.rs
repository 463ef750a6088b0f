//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sims_common::key::KeyEncoding;

use crate::AppState;

/// Service status as seen by operators and process supervisors
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    /// How composite keys are compared when consolidating
    pub key_encoding: KeyEncoding,
    /// Draft batches held in memory
    pub open_batches: usize,
    /// Open event streams
    pub event_subscribers: usize,
    pub event_capacity: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        module: "sims-bu",
        version: env!("CARGO_PKG_VERSION"),
        key_encoding: state.emitter.key_encoding(),
        open_batches: state.batches.open_count().await,
        event_subscribers: state.event_bus.subscriber_count(),
        event_capacity: state.event_bus.capacity(),
    })
}

/// Routes outside `/api`
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
