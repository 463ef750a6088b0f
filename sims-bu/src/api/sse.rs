//! Server-Sent Events for batch events
//!
//! Merge notices and submission results reach the operator UI here.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /api/events - SSE event stream
///
/// Streams events:
/// - ConnectionStatus (on connect)
/// - RowsMerged, ValidationFailed, SubmissionSucceeded, SubmissionFailed
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    sims_common::sse::create_event_sse_stream("sims-bu", &state.event_bus)
}
