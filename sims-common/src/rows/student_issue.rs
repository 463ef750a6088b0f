//! Student inventory issue rows
//!
//! Composite key: `(student_id, inventory_item_id, session_term_id)`.
//! Acting user: `given_by`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{
    normalize_text, optional, parse_quantity, require, require_quantity, BulkRecord, BulkRow,
    RowDefect, RowKind,
};
use crate::{Error, Result};

/// Draft student issue row as edited by the operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudentIssueRow {
    pub student_id: Option<String>,
    pub inventory_item_id: Option<String>,
    pub session_term_id: Option<String>,
    pub quantity: Option<i64>,
    pub notes: Option<String>,
    pub given_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentIssueField {
    StudentId,
    InventoryItemId,
    SessionTermId,
    Quantity,
    Notes,
    GivenBy,
}

impl StudentIssueField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StudentId => "student_id",
            Self::InventoryItemId => "inventory_item_id",
            Self::SessionTermId => "session_term_id",
            Self::Quantity => "quantity",
            Self::Notes => "notes",
            Self::GivenBy => "given_by",
        }
    }
}

impl fmt::Display for StudentIssueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentIssueField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "student_id" => Ok(Self::StudentId),
            "inventory_item_id" => Ok(Self::InventoryItemId),
            "session_term_id" => Ok(Self::SessionTermId),
            "quantity" => Ok(Self::Quantity),
            "notes" => Ok(Self::Notes),
            "given_by" => Ok(Self::GivenBy),
            _ => Err(Error::InvalidInput(format!("Unknown student issue field: {}", s))),
        }
    }
}

/// Consolidated student issue, one per composite key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentIssueRecord {
    pub student_id: String,
    pub inventory_item_id: String,
    pub session_term_id: String,
    pub quantity: i64,
    pub notes: Option<String>,
    pub given_by: String,
}

impl BulkRecord for StudentIssueRecord {
    fn key_fields(&self) -> Vec<&str> {
        vec![
            self.student_id.as_str(),
            self.inventory_item_id.as_str(),
            self.session_term_id.as_str(),
        ]
    }

    fn quantity(&self) -> i64 {
        self.quantity
    }

    fn absorb(&mut self, later: Self) -> Option<i64> {
        let total = self.quantity.checked_add(later.quantity)?;
        self.quantity = total;
        self.notes = later.notes;
        self.given_by = later.given_by;
        Some(total)
    }
}

impl BulkRow for StudentIssueRow {
    type Field = StudentIssueField;
    type Record = StudentIssueRecord;

    const KIND: RowKind = RowKind::StudentIssue;

    fn to_record(&self) -> std::result::Result<StudentIssueRecord, Vec<RowDefect>> {
        let mut defects = Vec::new();

        let student_id = require(&self.student_id, "student_id", &mut defects);
        let inventory_item_id = require(&self.inventory_item_id, "inventory_item_id", &mut defects);
        let session_term_id = require(&self.session_term_id, "session_term_id", &mut defects);
        let quantity = require_quantity(self.quantity, &mut defects);
        let given_by = require(&self.given_by, "given_by", &mut defects);

        if !defects.is_empty() {
            return Err(defects);
        }

        Ok(StudentIssueRecord {
            student_id,
            inventory_item_id,
            session_term_id,
            quantity,
            notes: optional(&self.notes),
            given_by,
        })
    }

    fn set_field(&mut self, field: StudentIssueField, value: &str) -> Result<()> {
        match field {
            StudentIssueField::StudentId => self.student_id = normalize_text(value),
            StudentIssueField::InventoryItemId => self.inventory_item_id = normalize_text(value),
            StudentIssueField::SessionTermId => self.session_term_id = normalize_text(value),
            StudentIssueField::Quantity => self.quantity = parse_quantity(value)?,
            StudentIssueField::Notes => self.notes = normalize_text(value),
            StudentIssueField::GivenBy => self.given_by = normalize_text(value),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_given_by_is_a_defect() {
        let row = StudentIssueRow {
            student_id: Some("S1".to_string()),
            inventory_item_id: Some("I1".to_string()),
            session_term_id: Some("T1".to_string()),
            quantity: Some(1),
            notes: None,
            given_by: None,
        };
        assert_eq!(
            row.to_record().unwrap_err(),
            vec![RowDefect::MissingField { field: "given_by" }]
        );
    }

    #[test]
    fn test_record_serializes_named_fields() {
        let record = StudentIssueRecord {
            student_id: "S1".to_string(),
            inventory_item_id: "I1".to_string(),
            session_term_id: "T1".to_string(),
            quantity: 2,
            notes: Some("term start".to_string()),
            given_by: "U1".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["student_id"], "S1");
        assert_eq!(json["quantity"], 2);
        assert_eq!(json["given_by"], "U1");
        assert!(json.get("temp_id").is_none());
    }

    #[test]
    fn test_set_field_rejects_unknown_name() {
        assert!("class_id".parse::<StudentIssueField>().is_err());
        let mut row = StudentIssueRow::default();
        row.set_field("given_by".parse().unwrap(), "U7").unwrap();
        assert_eq!(row.given_by.as_deref(), Some("U7"));
    }
}
