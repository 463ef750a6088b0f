//! Consolidation preview and submission endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use sims_common::submit::SubmissionReceipt;
use tracing::info;
use uuid::Uuid;

use crate::batch::DraftSnapshot;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/batches/:batch_id/submit response
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub batch_id: Uuid,
    #[serde(flatten)]
    pub receipt: SubmissionReceipt,
    /// Merge notices and the final result, as shown to the operator
    pub messages: Vec<String>,
}

/// POST /api/batches/:batch_id/consolidate
///
/// Runs consolidation over the current rows without calling upstream.
pub async fn consolidate_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let preview = state
        .batches
        .preview(batch_id, state.emitter.key_encoding())
        .await?;
    Ok(Json(preview))
}

/// POST /api/batches/:batch_id/submit
///
/// - 200: records accepted upstream, the batch's rows are consumed
/// - 422: invalid rows (positions listed), nothing sent
/// - 400: batch has no rows, nothing sent
/// - 502: upstream failed, rows kept for resubmission
/// - 409: a submission for this batch is already running
pub async fn submit_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Json<SubmitResponse>> {
    let snapshot = state.batches.begin_submit(batch_id).await?;

    // Detached so the batch is unlocked even if the client goes away
    let batches = state.batches.clone();
    let emitter = state.emitter.clone();
    let task = tokio::spawn(async move {
        let result = match &snapshot {
            DraftSnapshot::ClassEntitlements(rows) => emitter.submit(batch_id, rows).await,
            DraftSnapshot::StudentIssues(rows) => emitter.submit(batch_id, rows).await,
        };
        batches.finish_submit(batch_id, result.is_ok()).await;
        result
    });

    let receipt = task
        .await
        .map_err(|e| ApiError::Internal(format!("Submission task failed: {}", e)))??;

    info!(%batch_id, submitted = receipt.submitted, "Batch submitted");

    let mut messages: Vec<String> = receipt.merge_notices.iter().map(|n| n.message()).collect();
    messages.push(format!(
        "{} record(s) submitted successfully",
        receipt.submitted
    ));

    Ok(Json(SubmitResponse {
        batch_id,
        receipt,
        messages,
    }))
}
