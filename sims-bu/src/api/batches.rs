//! Draft batch and draft row endpoints

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sims_common::drafts::TempId;
use sims_common::rows::RowKind;
use uuid::Uuid;

use crate::batch::BatchSummary;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/batches request
#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    pub kind: RowKind,
}

/// PATCH /api/batches/:batch_id/rows/:temp_id request
#[derive(Debug, Deserialize)]
pub struct UpdateFieldRequest {
    pub field: String,
    /// String or number; null clears the field
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct AddRowResponse {
    pub temp_id: TempId,
}

/// POST /api/batches
pub async fn create_batch(
    State(state): State<AppState>,
    Json(request): Json<CreateBatchRequest>,
) -> (StatusCode, Json<BatchSummary>) {
    let summary = state.batches.create(request.kind).await;
    (StatusCode::CREATED, Json(summary))
}

/// GET /api/batches
pub async fn list_batches(State(state): State<AppState>) -> Json<Vec<BatchSummary>> {
    Json(state.batches.list().await)
}

/// GET /api/batches/:batch_id
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.batches.view(batch_id).await?))
}

/// DELETE /api/batches/:batch_id
pub async fn discard_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.batches.discard(batch_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/batches/:batch_id/rows
///
/// An empty body adds a blank row. Otherwise the body must be a JSON object
/// with any of the row's fields, sent as `application/json`.
pub async fn add_row(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let initial = initial_row_fields(&headers, &body)?;
    let temp_id = state.batches.add_row(batch_id, initial).await?;
    Ok((StatusCode::CREATED, Json(AddRowResponse { temp_id })))
}

/// PATCH /api/batches/:batch_id/rows/:temp_id
///
/// Responds with the row as stored, input trimmed.
pub async fn update_row(
    State(state): State<AppState>,
    Path((batch_id, temp_id)): Path<(Uuid, TempId)>,
    Json(request): Json<UpdateFieldRequest>,
) -> ApiResult<Json<Value>> {
    let value = field_value_text(&request.value)?;
    let row = state
        .batches
        .update_field(batch_id, temp_id, &request.field, &value)
        .await?;
    Ok(Json(row))
}

/// DELETE /api/batches/:batch_id/rows/:temp_id
pub async fn remove_row(
    State(state): State<AppState>,
    Path((batch_id, temp_id)): Path<(Uuid, TempId)>,
) -> ApiResult<StatusCode> {
    state.batches.remove_row(batch_id, temp_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Initial fields for a new row; `Null` for an empty body
fn initial_row_fields(headers: &HeaderMap, body: &[u8]) -> ApiResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false);
    if !is_json {
        return Err(ApiError::BadRequest(
            "Expected request with `Content-Type: application/json`".to_string(),
        ));
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    if !value.is_object() {
        return Err(ApiError::BadRequest(
            "Row fields must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// Operator input as text, the way form fields deliver it
fn field_value_text(value: &Value) -> ApiResult<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(ApiError::BadRequest(format!(
            "Field value must be a string or number, got {}",
            other
        ))),
    }
}
