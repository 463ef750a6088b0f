//! Draft row store
//!
//! Holds the operator's in-progress rows for one bulk upload, in the order
//! they were added. Each row gets a temporary identifier so a specific row
//! can be edited or removed; the identifier never leaves this service.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::rows::BulkRow;
use crate::{Error, Result};

/// Client-local row identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempId(Uuid);

impl TempId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for TempId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One draft row with its temporary identifier
#[derive(Debug, Clone, Serialize)]
pub struct DraftEntry<R> {
    pub temp_id: TempId,
    #[serde(flatten)]
    pub row: R,
}

/// Ordered collection of draft rows of one kind
#[derive(Debug, Clone)]
pub struct DraftRowStore<R: BulkRow> {
    entries: Vec<DraftEntry<R>>,
}

impl<R: BulkRow> Default for DraftRowStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: BulkRow> DraftRowStore<R> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a row and return its temporary identifier
    pub fn add_row(&mut self, row: R) -> TempId {
        let temp_id = TempId::generate();
        self.entries.push(DraftEntry { temp_id, row });
        temp_id
    }

    /// Remove a row, returning it
    pub fn remove_row(&mut self, temp_id: TempId) -> Result<R> {
        let index = self.position(temp_id)?;
        Ok(self.entries.remove(index).row)
    }

    /// Set one field of one row from operator input
    ///
    /// The row is left untouched when the value is rejected.
    pub fn update_field(&mut self, temp_id: TempId, field: R::Field, value: &str) -> Result<()> {
        let index = self.position(temp_id)?;
        self.entries[index].row.set_field(field, value)
    }

    /// Look up a row
    pub fn get(&self, temp_id: TempId) -> Option<&R> {
        self.entries
            .iter()
            .find(|entry| entry.temp_id == temp_id)
            .map(|entry| &entry.row)
    }

    /// Rows with their identifiers, in input order
    pub fn entries(&self) -> &[DraftEntry<R>] {
        &self.entries
    }

    /// Snapshot of the rows in input order
    pub fn rows(&self) -> Vec<R> {
        self.entries.iter().map(|entry| entry.row.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every row (after a successful submission)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, temp_id: TempId) -> Result<usize> {
        self.entries
            .iter()
            .position(|entry| entry.temp_id == temp_id)
            .ok_or_else(|| Error::NotFound(format!("Draft row {}", temp_id)))
    }
}
