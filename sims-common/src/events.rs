//! Batch event types and EventBus
//!
//! Events raised while submitting a bulk upload. They are broadcast on the
//! EventBus and streamed to the operator UI over SSE, so merge notices and
//! submission results are visible as they happen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::rows::RowKind;

/// Bulk upload event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BatchEvent {
    /// A row was folded into an earlier row with the same composite key
    RowsMerged {
        batch_id: Uuid,
        /// 1-based position of the merged row
        position: usize,
        /// Quantity after the merge
        new_quantity: i64,
        timestamp: DateTime<Utc>,
    },

    /// Submission refused because some rows are incomplete
    ValidationFailed {
        batch_id: Uuid,
        /// 1-based positions of the invalid rows
        positions: Vec<usize>,
        timestamp: DateTime<Utc>,
    },

    /// Consolidated records accepted by the bulk-upsert target
    SubmissionSucceeded {
        batch_id: Uuid,
        kind: RowKind,
        record_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Bulk-upsert target rejected the submission or could not be reached
    SubmissionFailed {
        batch_id: Uuid,
        kind: RowKind,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl BatchEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RowsMerged { .. } => "RowsMerged",
            Self::ValidationFailed { .. } => "ValidationFailed",
            Self::SubmissionSucceeded { .. } => "SubmissionSucceeded",
            Self::SubmissionFailed { .. } => "SubmissionFailed",
        }
    }

    pub fn batch_id(&self) -> Uuid {
        match self {
            Self::RowsMerged { batch_id, .. }
            | Self::ValidationFailed { batch_id, .. }
            | Self::SubmissionSucceeded { batch_id, .. }
            | Self::SubmissionFailed { batch_id, .. } => *batch_id,
        }
    }

    /// Operator-facing text
    pub fn message(&self) -> String {
        match self {
            Self::RowsMerged {
                position,
                new_quantity,
                ..
            } => format!(
                "Row {} merged with an existing entry. New quantity: {}",
                position, new_quantity
            ),
            Self::ValidationFailed { positions, .. } => validation_message(positions),
            Self::SubmissionSucceeded { record_count, .. } => {
                format!("{} record(s) submitted successfully", record_count)
            }
            Self::SubmissionFailed { message, .. } => message.clone(),
        }
    }
}

/// Single message naming every invalid row position
pub fn validation_message(positions: &[usize]) -> String {
    let list = positions
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("Please fill all required fields for row(s): {}", list)
}

/// Central event distribution bus for batch events
///
/// Wraps a tokio broadcast channel: publishing never blocks, slow
/// subscribers observe `Lagged` and skip ahead.
///
/// # Examples
///
/// ```
/// use sims_common::events::{BatchEvent, EventBus};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(BatchEvent::ValidationFailed {
///     batch_id: uuid::Uuid::new_v4(),
///     positions: vec![2],
///     timestamp: chrono::Utc::now(),
/// });
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BatchEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: BatchEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of live receivers (open SSE streams included)
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
