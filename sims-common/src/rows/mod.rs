//! Row kinds for bulk uploads
//!
//! A bulk upload is a list of operator-edited draft rows of one kind. Each
//! kind has two shapes:
//! - a draft row ([`BulkRow`]) with every field optional, as the operator
//!   fills it in
//! - a record ([`BulkRecord`]) with the required fields present, ready to
//!   be consolidated and sent to the bulk-upsert target
//!
//! Converting a draft row into its record is the required-field check.

mod class_entitlement;
mod student_issue;

pub use class_entitlement::{ClassEntitlementField, ClassEntitlementRecord, ClassEntitlementRow};
pub use student_issue::{StudentIssueField, StudentIssueRecord, StudentIssueRow};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Kind of bulk upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowKind {
    /// Inventory items a class is entitled to per session term
    ClassEntitlement,
    /// Inventory items issued to a student per session term
    StudentIssue,
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClassEntitlement => write!(f, "class-entitlement"),
            Self::StudentIssue => write!(f, "student-issue"),
        }
    }
}

impl FromStr for RowKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "class-entitlement" => Ok(Self::ClassEntitlement),
            "student-issue" => Ok(Self::StudentIssue),
            _ => Err(Error::InvalidInput(format!("Unknown row kind: {}", s))),
        }
    }
}

/// Why a draft row cannot be consolidated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "defect", rename_all = "snake_case")]
pub enum RowDefect {
    /// A required field is unset or blank
    MissingField { field: &'static str },
    /// Quantity is below zero
    NegativeQuantity { quantity: i64 },
    /// Adding this row's quantity to its key's running total overflows
    QuantityOverflow { quantity: i64 },
}

impl fmt::Display for RowDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "{} is required", field),
            Self::NegativeQuantity { quantity } => {
                write!(f, "quantity must not be negative (got {})", quantity)
            }
            Self::QuantityOverflow { quantity } => {
                write!(f, "quantity {} makes the merged total too large", quantity)
            }
        }
    }
}

/// Consolidated record sent to the bulk-upsert target
pub trait BulkRecord: Clone + fmt::Debug + PartialEq + Serialize + Send + Sync + 'static {
    /// Composite key fields, in key order
    fn key_fields(&self) -> Vec<&str>;

    /// Quantity carried by this record
    fn quantity(&self) -> i64;

    /// Merge a later record with the same key into this one
    ///
    /// Scalar fields are replaced by `later`'s; quantities are summed.
    /// Returns the merged quantity, or `None` if the sum overflows, in
    /// which case `self` is left unchanged.
    fn absorb(&mut self, later: Self) -> Option<i64>;
}

/// Operator-edited draft row
pub trait BulkRow:
    Clone + Default + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Editable field names
    type Field: Copy + fmt::Debug + fmt::Display + FromStr<Err = Error> + Send + Sync;

    /// Record produced by a valid row
    type Record: BulkRecord;

    /// Kind of upload this row belongs to
    const KIND: RowKind;

    /// Check required fields and build the record
    ///
    /// Every defect is reported, not just the first.
    fn to_record(&self) -> std::result::Result<Self::Record, Vec<RowDefect>>;

    /// Set one field from operator input
    ///
    /// Blank input clears the field. Quantity must parse as an integer.
    fn set_field(&mut self, field: Self::Field, value: &str) -> Result<()>;
}

/// Trim operator input; blank becomes unset
pub(crate) fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a quantity from operator input; blank becomes unset
pub(crate) fn parse_quantity(value: &str) -> Result<Option<i64>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(Some)
        .map_err(|_| Error::InvalidInput(format!("Quantity must be a whole number: {}", trimmed)))
}

/// Required text field: present and non-blank
pub(crate) fn require(
    value: &Option<String>,
    field: &'static str,
    defects: &mut Vec<RowDefect>,
) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            defects.push(RowDefect::MissingField { field });
            String::new()
        }
    }
}

/// Required quantity: present and not negative
pub(crate) fn require_quantity(value: Option<i64>, defects: &mut Vec<RowDefect>) -> i64 {
    match value {
        Some(q) if q >= 0 => q,
        Some(q) => {
            defects.push(RowDefect::NegativeQuantity { quantity: q });
            0
        }
        None => {
            defects.push(RowDefect::MissingField { field: "quantity" });
            0
        }
    }
}

/// Optional text field, trimmed; blank becomes unset
pub(crate) fn optional(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(normalize_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_kind_roundtrip_names() {
        assert_eq!("class-entitlement".parse::<RowKind>().unwrap(), RowKind::ClassEntitlement);
        assert_eq!("student-issue".parse::<RowKind>().unwrap(), RowKind::StudentIssue);
        assert_eq!(RowKind::StudentIssue.to_string(), "student-issue");
        assert!("distribution".parse::<RowKind>().is_err());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(" 12 ").unwrap(), Some(12));
        assert_eq!(parse_quantity("").unwrap(), None);
        assert_eq!(parse_quantity("-3").unwrap(), Some(-3));
        assert!(parse_quantity("2.5").is_err());
        assert!(parse_quantity("ten").is_err());
    }

    #[test]
    fn test_require_collects_defects() {
        let mut defects = Vec::new();
        assert_eq!(require(&Some(" C1 ".to_string()), "class_id", &mut defects), "C1");
        require(&Some("   ".to_string()), "inventory_item_id", &mut defects);
        require(&None, "session_term_id", &mut defects);
        require_quantity(Some(-1), &mut defects);
        require_quantity(None, &mut defects);

        assert_eq!(
            defects,
            vec![
                RowDefect::MissingField { field: "inventory_item_id" },
                RowDefect::MissingField { field: "session_term_id" },
                RowDefect::NegativeQuantity { quantity: -1 },
                RowDefect::MissingField { field: "quantity" },
            ]
        );
    }

    #[test]
    fn test_row_defect_serializes_tagged() {
        let json = serde_json::to_value(RowDefect::MissingField { field: "class_id" }).unwrap();
        assert_eq!(json["defect"], "missing_field");
        assert_eq!(json["field"], "class_id");
    }
}
