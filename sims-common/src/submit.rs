//! Submission of consolidated records to the bulk-upsert target
//!
//! The [`SubmissionEmitter`] runs the consolidator over a draft set and only
//! calls the [`BulkUpsert`] collaborator when every row is valid and there
//! is at least one record. Merge notices are published on the EventBus
//! before the upstream call. Upstream failures are reported once; nothing
//! is retried.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::consolidate::{consolidate, MergeNotice};
use crate::events::{validation_message, BatchEvent, EventBus};
use crate::key::KeyEncoding;
use crate::rows::{BulkRow, RowKind};

/// Shown when the upstream error carries no usable message
pub const GENERIC_SUBMIT_FAILURE: &str = "Failed to submit records. Please try again.";

/// Failure reported by the bulk-upsert target
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// Target could not be reached or the request did not complete
    #[error("Network error: {0}")]
    Network(String),

    /// Target answered with a non-success status
    #[error("Upstream rejected submission with status {status}")]
    Rejected {
        status: u16,
        /// Message extracted from the error payload, if any
        message: Option<String>,
    },

    /// Target answered with a body that could not be read
    #[error("Invalid upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Operator-facing text: the target's own message, else a generic one
    pub fn operator_message(&self) -> String {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => GENERIC_SUBMIT_FAILURE.to_string(),
        }
    }
}

/// External idempotent batch write keyed by composite key
#[async_trait]
pub trait BulkUpsert: Send + Sync {
    /// Send a JSON array of consolidated records for one row kind
    ///
    /// Returns the target's response body (`Value::Null` when empty).
    async fn bulk_upsert(&self, kind: RowKind, records: &Value) -> Result<Value, UpstreamError>;
}

/// Why a submission did not reach or was refused by the target
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Some rows are incomplete; nothing was sent
    #[error("{}", validation_message(.positions))]
    Validation { positions: Vec<usize> },

    /// Draft set has no rows; nothing was sent
    #[error("No rows to submit")]
    EmptyBatch,

    /// Target refused the batch or could not be reached
    #[error("Upstream submission failed: {0}")]
    Upstream(#[from] UpstreamError),

    /// Records could not be serialized
    #[error("Failed to encode records: {0}")]
    Encode(String),
}

impl SubmitError {
    /// Operator-facing text
    pub fn operator_message(&self) -> String {
        match self {
            Self::Upstream(err) => err.operator_message(),
            other => other.to_string(),
        }
    }
}

/// Outcome of a successful submission
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub kind: RowKind,
    /// Number of consolidated records sent
    pub submitted: usize,
    pub merge_notices: Vec<MergeNotice>,
    /// Body returned by the target
    pub upstream_response: Value,
}

/// Consolidates a draft set and forwards it to the bulk-upsert target
#[derive(Clone)]
pub struct SubmissionEmitter {
    upstream: Arc<dyn BulkUpsert>,
    event_bus: EventBus,
    key_encoding: KeyEncoding,
}

impl SubmissionEmitter {
    pub fn new(upstream: Arc<dyn BulkUpsert>, event_bus: EventBus, key_encoding: KeyEncoding) -> Self {
        Self {
            upstream,
            event_bus,
            key_encoding,
        }
    }

    pub fn key_encoding(&self) -> KeyEncoding {
        self.key_encoding
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Consolidate `rows` and submit them as one batch
    pub async fn submit<R: BulkRow>(
        &self,
        batch_id: Uuid,
        rows: &[R],
    ) -> Result<SubmissionReceipt, SubmitError> {
        let outcome = consolidate(rows, self.key_encoding);

        if !outcome.is_valid() {
            warn!(
                %batch_id,
                positions = ?outcome.invalid_row_positions,
                "Submission refused: invalid rows"
            );
            self.event_bus.emit_lossy(BatchEvent::ValidationFailed {
                batch_id,
                positions: outcome.invalid_row_positions.clone(),
                timestamp: Utc::now(),
            });
            return Err(SubmitError::Validation {
                positions: outcome.invalid_row_positions,
            });
        }

        if outcome.records.is_empty() {
            info!(%batch_id, "Submission skipped: no rows");
            return Err(SubmitError::EmptyBatch);
        }

        for notice in &outcome.merge_notices {
            info!(
                %batch_id,
                position = notice.position,
                new_quantity = notice.new_quantity,
                "Merged duplicate row"
            );
            self.event_bus.emit_lossy(BatchEvent::RowsMerged {
                batch_id,
                position: notice.position,
                new_quantity: notice.new_quantity,
                timestamp: Utc::now(),
            });
        }

        let payload =
            serde_json::to_value(&outcome.records).map_err(|e| SubmitError::Encode(e.to_string()))?;
        let submitted = outcome.records.len();
        let kind = R::KIND;

        info!(
            %batch_id,
            %kind,
            rows = rows.len(),
            records = submitted,
            "Submitting consolidated records"
        );

        match self.upstream.bulk_upsert(kind, &payload).await {
            Ok(upstream_response) => {
                info!(%batch_id, records = submitted, "Bulk upsert accepted");
                self.event_bus.emit_lossy(BatchEvent::SubmissionSucceeded {
                    batch_id,
                    kind,
                    record_count: submitted,
                    timestamp: Utc::now(),
                });
                Ok(SubmissionReceipt {
                    kind,
                    submitted,
                    merge_notices: outcome.merge_notices,
                    upstream_response,
                })
            }
            Err(err) => {
                warn!(%batch_id, error = %err, "Bulk upsert failed");
                self.event_bus.emit_lossy(BatchEvent::SubmissionFailed {
                    batch_id,
                    kind,
                    message: err.operator_message(),
                    timestamp: Utc::now(),
                });
                Err(SubmitError::Upstream(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::ClassEntitlementRow;
    use std::sync::Mutex;

    /// Records every call; optionally fails
    #[derive(Default)]
    struct RecordingUpsert {
        calls: Mutex<Vec<(RowKind, Value)>>,
        failure: Option<UpstreamError>,
    }

    #[async_trait]
    impl BulkUpsert for RecordingUpsert {
        async fn bulk_upsert(&self, kind: RowKind, records: &Value) -> Result<Value, UpstreamError> {
            self.calls.lock().unwrap().push((kind, records.clone()));
            match &self.failure {
                Some(err) => Err(err.clone()),
                None => Ok(serde_json::json!({"upserted": records.as_array().map(|a| a.len())})),
            }
        }
    }

    fn row(class: &str, qty: i64) -> ClassEntitlementRow {
        ClassEntitlementRow {
            class_id: Some(class.to_string()),
            inventory_item_id: Some("I1".to_string()),
            session_term_id: Some("T1".to_string()),
            quantity: Some(qty),
            notes: None,
            created_by: Some("U1".to_string()),
        }
    }

    fn emitter(upstream: Arc<RecordingUpsert>, bus: EventBus) -> SubmissionEmitter {
        SubmissionEmitter::new(upstream, bus, KeyEncoding::Tuple)
    }

    #[tokio::test]
    async fn test_submit_sends_consolidated_payload() {
        let upstream = Arc::new(RecordingUpsert::default());
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let batch_id = Uuid::new_v4();

        let receipt = emitter(upstream.clone(), bus)
            .submit(batch_id, &[row("C1", 5), row("C1", 3), row("C2", 1)])
            .await
            .unwrap();

        assert_eq!(receipt.submitted, 2);
        assert_eq!(receipt.kind, RowKind::ClassEntitlement);
        assert_eq!(receipt.merge_notices, vec![MergeNotice { position: 2, new_quantity: 8 }]);

        {
            let calls = upstream.calls.lock().unwrap();
            assert_eq!(calls.len(), 1);
            let (kind, payload) = &calls[0];
            assert_eq!(*kind, RowKind::ClassEntitlement);
            let records = payload.as_array().unwrap();
            assert_eq!(records.len(), 2);
            assert_eq!(records[0]["class_id"], "C1");
            assert_eq!(records[0]["quantity"], 8);
            assert_eq!(records[1]["class_id"], "C2");
            assert!(records[0].get("temp_id").is_none());
        }

        // Merge notice published before the success event
        assert!(matches!(
            rx.recv().await.unwrap(),
            BatchEvent::RowsMerged { position: 2, new_quantity: 8, .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            BatchEvent::SubmissionSucceeded { record_count: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_rows_block_submission() {
        let upstream = Arc::new(RecordingUpsert::default());
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let err = emitter(upstream.clone(), bus)
            .submit(Uuid::new_v4(), &[row("C1", 1), row("", 1), row("C3", -1)])
            .await
            .unwrap_err();

        match &err {
            SubmitError::Validation { positions } => assert_eq!(positions, &vec![2, 3]),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(
            err.operator_message(),
            "Please fill all required fields for row(s): 2, 3"
        );
        assert!(upstream.calls.lock().unwrap().is_empty());
        assert!(matches!(
            rx.recv().await.unwrap(),
            BatchEvent::ValidationFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_is_guarded() {
        let upstream = Arc::new(RecordingUpsert::default());
        let err = emitter(upstream.clone(), EventBus::new(4))
            .submit::<ClassEntitlementRow>(Uuid::new_v4(), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, SubmitError::EmptyBatch));
        assert!(upstream.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_uses_payload_message() {
        let upstream = Arc::new(RecordingUpsert {
            failure: Some(UpstreamError::Rejected {
                status: 422,
                message: Some("Inventory item I1 does not exist".to_string()),
            }),
            ..Default::default()
        });
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let err = emitter(upstream.clone(), bus)
            .submit(Uuid::new_v4(), &[row("C1", 1)])
            .await
            .unwrap_err();

        assert_eq!(err.operator_message(), "Inventory item I1 does not exist");
        assert_eq!(upstream.calls.lock().unwrap().len(), 1);
        match rx.recv().await.unwrap() {
            BatchEvent::SubmissionFailed { message, .. } => {
                assert_eq!(message, "Inventory item I1 does not exist")
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_operator_message_falls_back_to_generic() {
        assert_eq!(
            UpstreamError::Network("connection refused".to_string()).operator_message(),
            GENERIC_SUBMIT_FAILURE
        );
        assert_eq!(
            UpstreamError::Rejected { status: 500, message: None }.operator_message(),
            GENERIC_SUBMIT_FAILURE
        );
        assert_eq!(
            UpstreamError::Rejected { status: 500, message: Some("  ".to_string()) }.operator_message(),
            GENERIC_SUBMIT_FAILURE
        );
    }
}
