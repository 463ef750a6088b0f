//! Draft row consolidation
//!
//! Turns an ordered list of draft rows into the deduplicated list sent to a
//! bulk-upsert target:
//!
//! 1. Every row is checked first. If any row is invalid, the outcome only
//!    lists the invalid 1-based positions and carries no records.
//! 2. Otherwise rows are folded in input order. The first row for a
//!    composite key creates a record; each later row with the same key adds
//!    its quantity and replaces the scalar fields, producing a merge notice
//!    with the later row's position and the running total.
//! 3. Records keep the order in which each key was first seen.
//!
//! A merged total that does not fit in an `i64` rejects the set the same
//! way an invalid row does, listing the row that overflowed.
//!
//! Pure and deterministic: no I/O, never fails.

use serde::Serialize;
use std::collections::HashMap;

use crate::key::{CompositeKey, KeyEncoding};
use crate::rows::{BulkRecord, BulkRow, RowDefect};

/// A later row was folded into an earlier record with the same key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeNotice {
    /// 1-based input position of the row that was merged
    pub position: usize,
    /// Quantity of the record after the merge
    pub new_quantity: i64,
}

impl MergeNotice {
    /// Operator-facing text
    pub fn message(&self) -> String {
        format!(
            "Row {} merged with an existing entry. New quantity: {}",
            self.position, self.new_quantity
        )
    }
}

/// Invalid row with every defect found on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidRow {
    /// 1-based input position
    pub position: usize,
    pub defects: Vec<RowDefect>,
}

/// Result of [`consolidate`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidationOutcome<T> {
    pub records: Vec<T>,
    pub invalid_row_positions: Vec<usize>,
    pub merge_notices: Vec<MergeNotice>,
}

impl<T> ConsolidationOutcome<T> {
    fn rejected(invalid_row_positions: Vec<usize>) -> Self {
        Self {
            records: Vec::new(),
            invalid_row_positions,
            merge_notices: Vec::new(),
        }
    }

    /// True when no row was invalid
    pub fn is_valid(&self) -> bool {
        self.invalid_row_positions.is_empty()
    }
}

/// Check every row, returning the invalid ones in input order
///
/// When every row is complete, rows whose quantity would overflow their
/// key's merged total are reported with [`RowDefect::QuantityOverflow`].
pub fn validate_rows<R: BulkRow>(rows: &[R], encoding: KeyEncoding) -> Vec<InvalidRow> {
    let (valid, invalid) = classify(rows);
    if !invalid.is_empty() {
        return invalid;
    }

    let quantities: Vec<i64> = valid.iter().map(|r| r.quantity()).collect();
    match fold(valid, encoding) {
        Ok(_) => Vec::new(),
        Err(positions) => positions
            .into_iter()
            .map(|position| InvalidRow {
                position,
                defects: vec![RowDefect::QuantityOverflow {
                    quantity: quantities[position - 1],
                }],
            })
            .collect(),
    }
}

/// Consolidate draft rows by composite key
///
/// # Examples
/// ```
/// use sims_common::consolidate::consolidate;
/// use sims_common::key::KeyEncoding;
/// use sims_common::rows::ClassEntitlementRow;
///
/// let row = |qty: i64, notes: &str| ClassEntitlementRow {
///     class_id: Some("C1".into()),
///     inventory_item_id: Some("I1".into()),
///     session_term_id: Some("T1".into()),
///     quantity: Some(qty),
///     notes: Some(notes.into()),
///     created_by: Some("U1".into()),
/// };
///
/// let outcome = consolidate(&[row(5, "a"), row(3, "b")], KeyEncoding::Tuple);
/// assert_eq!(outcome.records.len(), 1);
/// assert_eq!(outcome.records[0].quantity, 8);
/// assert_eq!(outcome.records[0].notes.as_deref(), Some("b"));
/// assert_eq!(outcome.merge_notices[0].position, 2);
/// assert_eq!(outcome.merge_notices[0].new_quantity, 8);
/// ```
pub fn consolidate<R: BulkRow>(rows: &[R], encoding: KeyEncoding) -> ConsolidationOutcome<R::Record> {
    // Classify every row before folding any of them
    let (valid, invalid) = classify(rows);
    if !invalid.is_empty() {
        return ConsolidationOutcome::rejected(invalid.into_iter().map(|r| r.position).collect());
    }

    match fold(valid, encoding) {
        Ok((records, merge_notices)) => ConsolidationOutcome {
            records,
            invalid_row_positions: Vec::new(),
            merge_notices,
        },
        Err(overflow_positions) => ConsolidationOutcome::rejected(overflow_positions),
    }
}

/// Split rows into records and invalid rows, keeping input order
fn classify<R: BulkRow>(rows: &[R]) -> (Vec<R::Record>, Vec<InvalidRow>) {
    let mut valid = Vec::with_capacity(rows.len());
    let mut invalid = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        match row.to_record() {
            Ok(record) => valid.push(record),
            Err(defects) => invalid.push(InvalidRow {
                position: index + 1,
                defects,
            }),
        }
    }
    (valid, invalid)
}

/// Fold records by key in input order
///
/// `Err` holds the 1-based positions of rows whose quantity overflows the
/// running total for their key.
fn fold<T: BulkRecord>(
    valid: Vec<T>,
    encoding: KeyEncoding,
) -> std::result::Result<(Vec<T>, Vec<MergeNotice>), Vec<usize>> {
    let mut records: Vec<T> = Vec::with_capacity(valid.len());
    let mut seen: HashMap<CompositeKey, usize> = HashMap::with_capacity(valid.len());
    let mut merge_notices = Vec::new();
    let mut overflow_positions = Vec::new();

    for (index, record) in valid.into_iter().enumerate() {
        let position = index + 1;
        let key = CompositeKey::encode(&record.key_fields(), encoding);
        match seen.get(&key) {
            Some(&slot) => match records[slot].absorb(record) {
                Some(new_quantity) => merge_notices.push(MergeNotice {
                    position,
                    new_quantity,
                }),
                None => overflow_positions.push(position),
            },
            None => {
                seen.insert(key, records.len());
                records.push(record);
            }
        }
    }

    if overflow_positions.is_empty() {
        Ok((records, merge_notices))
    } else {
        Err(overflow_positions)
    }
}
