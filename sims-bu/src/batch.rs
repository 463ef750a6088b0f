//! Draft batches held for the operator UI
//!
//! A batch is one bulk upload in progress: a row kind plus its draft rows.
//! Batches live in memory only. While a batch is being submitted it is
//! locked against edits and against a second submission.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sims_common::consolidate::{consolidate, validate_rows, ConsolidationOutcome, InvalidRow};
use sims_common::drafts::{DraftEntry, DraftRowStore, TempId};
use sims_common::events::validation_message;
use sims_common::key::KeyEncoding;
use sims_common::rows::{BulkRow, ClassEntitlementRow, RowKind, StudentIssueRow};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Draft rows of one kind
#[derive(Debug, Clone)]
pub enum DraftBatch {
    ClassEntitlements(DraftRowStore<ClassEntitlementRow>),
    StudentIssues(DraftRowStore<StudentIssueRow>),
}

impl DraftBatch {
    pub fn new(kind: RowKind) -> Self {
        match kind {
            RowKind::ClassEntitlement => Self::ClassEntitlements(DraftRowStore::new()),
            RowKind::StudentIssue => Self::StudentIssues(DraftRowStore::new()),
        }
    }

    pub fn kind(&self) -> RowKind {
        match self {
            Self::ClassEntitlements(_) => RowKind::ClassEntitlement,
            Self::StudentIssues(_) => RowKind::StudentIssue,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::ClassEntitlements(store) => store.len(),
            Self::StudentIssues(store) => store.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self) {
        match self {
            Self::ClassEntitlements(store) => store.clear(),
            Self::StudentIssues(store) => store.clear(),
        }
    }

    fn snapshot(&self) -> DraftSnapshot {
        match self {
            Self::ClassEntitlements(store) => DraftSnapshot::ClassEntitlements(store.rows()),
            Self::StudentIssues(store) => DraftSnapshot::StudentIssues(store.rows()),
        }
    }
}

/// Rows copied out of a batch for submission
#[derive(Debug, Clone)]
pub enum DraftSnapshot {
    ClassEntitlements(Vec<ClassEntitlementRow>),
    StudentIssues(Vec<StudentIssueRow>),
}

/// Batch listing entry
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub kind: RowKind,
    pub row_count: usize,
    pub submitting: bool,
    pub created_at: DateTime<Utc>,
}

/// Consolidation preview: outcome plus per-row detail
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationPreview<T> {
    pub kind: RowKind,
    #[serde(flatten)]
    pub outcome: ConsolidationOutcome<T>,
    pub invalid_rows: Vec<InvalidRow>,
    /// Operator-facing messages for the outcome
    pub messages: Vec<String>,
}

struct BatchSlot {
    drafts: DraftBatch,
    created_at: DateTime<Utc>,
    submitting: bool,
}

impl BatchSlot {
    fn summary(&self, batch_id: Uuid) -> BatchSummary {
        BatchSummary {
            batch_id,
            kind: self.drafts.kind(),
            row_count: self.drafts.len(),
            submitting: self.submitting,
            created_at: self.created_at,
        }
    }

    fn ensure_editable(&self, batch_id: Uuid) -> ApiResult<()> {
        if self.submitting {
            return Err(ApiError::Conflict(format!(
                "Batch {} is being submitted",
                batch_id
            )));
        }
        Ok(())
    }
}

/// In-memory registry of draft batches
#[derive(Clone, Default)]
pub struct BatchRegistry {
    batches: Arc<RwLock<HashMap<Uuid, BatchSlot>>>,
}

impl BatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new empty batch
    pub async fn create(&self, kind: RowKind) -> BatchSummary {
        let batch_id = Uuid::new_v4();
        let slot = BatchSlot {
            drafts: DraftBatch::new(kind),
            created_at: Utc::now(),
            submitting: false,
        };
        let summary = slot.summary(batch_id);
        self.batches.write().await.insert(batch_id, slot);
        info!(%batch_id, %kind, "Opened draft batch");
        summary
    }

    /// Number of batches not yet discarded
    pub async fn open_count(&self) -> usize {
        self.batches.read().await.len()
    }

    /// All batches, oldest first
    pub async fn list(&self) -> Vec<BatchSummary> {
        let batches = self.batches.read().await;
        let mut summaries: Vec<BatchSummary> = batches
            .iter()
            .map(|(id, slot)| slot.summary(*id))
            .collect();
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    /// Batch summary and its rows
    pub async fn view(&self, batch_id: Uuid) -> ApiResult<Value> {
        let batches = self.batches.read().await;
        let slot = batches.get(&batch_id).ok_or_else(|| not_found(batch_id))?;

        let rows = match &slot.drafts {
            DraftBatch::ClassEntitlements(store) => serde_json::to_value(store.entries()),
            DraftBatch::StudentIssues(store) => serde_json::to_value(store.entries()),
        }
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        let mut body = serde_json::to_value(slot.summary(batch_id))
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        body["rows"] = rows;
        Ok(body)
    }

    /// Drop a batch and its rows
    pub async fn discard(&self, batch_id: Uuid) -> ApiResult<()> {
        let mut batches = self.batches.write().await;
        let slot = batches.get(&batch_id).ok_or_else(|| not_found(batch_id))?;
        slot.ensure_editable(batch_id)?;
        batches.remove(&batch_id);
        info!(%batch_id, "Discarded draft batch");
        Ok(())
    }

    /// Append a row, optionally pre-filled from a JSON object
    pub async fn add_row(&self, batch_id: Uuid, initial: Value) -> ApiResult<TempId> {
        let mut batches = self.batches.write().await;
        let slot = batches.get_mut(&batch_id).ok_or_else(|| not_found(batch_id))?;
        slot.ensure_editable(batch_id)?;

        let temp_id = match &mut slot.drafts {
            DraftBatch::ClassEntitlements(store) => add_row(store, initial)?,
            DraftBatch::StudentIssues(store) => add_row(store, initial)?,
        };
        debug!(%batch_id, %temp_id, "Added draft row");
        Ok(temp_id)
    }

    /// Set one field of one row, returning the row as stored
    pub async fn update_field(
        &self,
        batch_id: Uuid,
        temp_id: TempId,
        field: &str,
        value: &str,
    ) -> ApiResult<Value> {
        let mut batches = self.batches.write().await;
        let slot = batches.get_mut(&batch_id).ok_or_else(|| not_found(batch_id))?;
        slot.ensure_editable(batch_id)?;

        match &mut slot.drafts {
            DraftBatch::ClassEntitlements(store) => update_field(store, temp_id, field, value),
            DraftBatch::StudentIssues(store) => update_field(store, temp_id, field, value),
        }
    }

    pub async fn remove_row(&self, batch_id: Uuid, temp_id: TempId) -> ApiResult<()> {
        let mut batches = self.batches.write().await;
        let slot = batches.get_mut(&batch_id).ok_or_else(|| not_found(batch_id))?;
        slot.ensure_editable(batch_id)?;

        match &mut slot.drafts {
            DraftBatch::ClassEntitlements(store) => store.remove_row(temp_id).map(|_| ()),
            DraftBatch::StudentIssues(store) => store.remove_row(temp_id).map(|_| ()),
        }?;
        debug!(%batch_id, %temp_id, "Removed draft row");
        Ok(())
    }

    /// Consolidate without submitting
    pub async fn preview(&self, batch_id: Uuid, encoding: KeyEncoding) -> ApiResult<Value> {
        let batches = self.batches.read().await;
        let slot = batches.get(&batch_id).ok_or_else(|| not_found(batch_id))?;

        let preview = match &slot.drafts {
            DraftBatch::ClassEntitlements(store) => preview(store, encoding),
            DraftBatch::StudentIssues(store) => preview(store, encoding),
        };
        preview.map_err(|e| ApiError::Internal(e.to_string()))
    }

    /// Lock a batch for submission and copy its rows out
    ///
    /// Fails with a conflict when a submission is already running.
    pub async fn begin_submit(&self, batch_id: Uuid) -> ApiResult<DraftSnapshot> {
        let mut batches = self.batches.write().await;
        let slot = batches.get_mut(&batch_id).ok_or_else(|| not_found(batch_id))?;
        if slot.submitting {
            return Err(ApiError::Conflict(format!(
                "Batch {} is already being submitted",
                batch_id
            )));
        }
        slot.submitting = true;
        Ok(slot.drafts.snapshot())
    }

    /// Unlock a batch; rows are consumed only when the submission succeeded
    pub async fn finish_submit(&self, batch_id: Uuid, succeeded: bool) {
        let mut batches = self.batches.write().await;
        if let Some(slot) = batches.get_mut(&batch_id) {
            slot.submitting = false;
            if succeeded {
                slot.drafts.clear();
            }
        }
    }
}

fn not_found(batch_id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Batch {}", batch_id))
}

fn add_row<R: BulkRow>(store: &mut DraftRowStore<R>, initial: Value) -> ApiResult<TempId> {
    let row: R = if initial.is_null() {
        R::default()
    } else {
        serde_json::from_value(initial)
            .map_err(|e| ApiError::BadRequest(format!("Invalid {} row: {}", R::KIND, e)))?
    };
    Ok(store.add_row(row))
}

fn update_field<R: BulkRow>(
    store: &mut DraftRowStore<R>,
    temp_id: TempId,
    field: &str,
    value: &str,
) -> ApiResult<Value> {
    let field: R::Field = field.parse()?;
    store.update_field(temp_id, field, value)?;

    let row = store
        .get(temp_id)
        .ok_or_else(|| ApiError::NotFound(format!("Row {}", temp_id)))?;
    serde_json::to_value(DraftEntry { temp_id, row }).map_err(|e| ApiError::Internal(e.to_string()))
}

fn preview<R: BulkRow>(
    store: &DraftRowStore<R>,
    encoding: KeyEncoding,
) -> serde_json::Result<Value> {
    let rows = store.rows();
    let outcome = consolidate(&rows, encoding);

    let messages = if outcome.is_valid() {
        outcome.merge_notices.iter().map(|n| n.message()).collect()
    } else {
        vec![validation_message(&outcome.invalid_row_positions)]
    };

    serde_json::to_value(ConsolidationPreview {
        kind: R::KIND,
        invalid_rows: validate_rows(&rows, encoding),
        outcome,
        messages,
    })
}
