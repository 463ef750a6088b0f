//! sims-bu library - Bulk Upload module
//!
//! Holds operator draft batches (class inventory entitlements, student
//! inventory issues), consolidates them by composite key and submits the
//! result to the bulk-upsert REST endpoint.

use axum::Router;
use sims_common::events::EventBus;
use sims_common::submit::SubmissionEmitter;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod batch;
pub mod error;
pub mod upstream;

use batch::BatchRegistry;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Draft batches in progress
    pub batches: BatchRegistry,
    /// Consolidation + upstream submission
    pub emitter: SubmissionEmitter,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
}

impl AppState {
    /// Create new application state
    ///
    /// The emitter's event bus is shared with the SSE endpoint.
    pub fn new(emitter: SubmissionEmitter) -> Self {
        let event_bus = emitter.event_bus().clone();
        Self {
            batches: BatchRegistry::new(),
            emitter,
            event_bus,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, patch, post};

    let api = Router::new()
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/api/events", get(api::event_stream))
        .route(
            "/api/batches",
            post(api::create_batch).get(api::list_batches),
        )
        .route(
            "/api/batches/:batch_id",
            get(api::get_batch).delete(api::discard_batch),
        )
        .route("/api/batches/:batch_id/rows", post(api::add_row))
        .route(
            "/api/batches/:batch_id/rows/:temp_id",
            patch(api::update_row).delete(api::remove_row),
        )
        .route(
            "/api/batches/:batch_id/consolidate",
            post(api::consolidate_batch),
        )
        .route("/api/batches/:batch_id/submit", post(api::submit_batch));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
