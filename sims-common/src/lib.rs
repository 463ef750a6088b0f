//! # SIMS Common Library
//!
//! Shared code for the SIMS back-office services including:
//! - Row kinds for bulk uploads (class entitlements, student issues)
//! - Composite key encoding
//! - Draft row store
//! - Consolidation of draft rows before a bulk upsert
//! - Submission to the bulk-upsert collaborator
//! - Event types (BatchEvent) and the EventBus
//! - Configuration loading

pub mod config;
pub mod consolidate;
pub mod drafts;
pub mod error;
pub mod events;
pub mod key;
pub mod rows;
pub mod sse;
pub mod submit;

pub use consolidate::{consolidate, ConsolidationOutcome, MergeNotice};
pub use drafts::{DraftRowStore, TempId};
pub use error::{Error, Result};
pub use key::{CompositeKey, KeyEncoding};
pub use rows::{BulkRecord, BulkRow, RowKind};
