//! Property tests for draft row consolidation
//!
//! Keys are drawn from a small alphabet so collisions are frequent.

use proptest::prelude::*;
use proptest::test_runner::Config;
use sims_common::consolidate::consolidate;
use sims_common::key::KeyEncoding;
use sims_common::rows::{BulkRecord, ClassEntitlementRow};
use std::collections::HashSet;

fn valid_row() -> impl Strategy<Value = ClassEntitlementRow> {
    (
        prop::sample::select(vec!["C1", "C2", "C-3"]),
        prop::sample::select(vec!["I1", "I2"]),
        prop::sample::select(vec!["T1", "T2"]),
        0_i64..10_000,
        prop::option::of("[a-z]{1,8}"),
        prop::sample::select(vec!["U1", "U2", "U3"]),
    )
        .prop_map(|(class, item, term, quantity, notes, user)| ClassEntitlementRow {
            class_id: Some(class.to_string()),
            inventory_item_id: Some(item.to_string()),
            session_term_id: Some(term.to_string()),
            quantity: Some(quantity),
            notes,
            created_by: Some(user.to_string()),
        })
}

fn any_row() -> impl Strategy<Value = ClassEntitlementRow> {
    prop_oneof![
        4 => valid_row(),
        1 => valid_row().prop_map(|mut r| { r.class_id = None; r }),
        1 => valid_row().prop_map(|mut r| { r.created_by = Some(" ".to_string()); r }),
        1 => (valid_row(), -100_i64..0).prop_map(|(mut r, q)| { r.quantity = Some(q); r }),
    ]
}

fn key_of(row: &ClassEntitlementRow) -> (String, String, String) {
    (
        row.class_id.clone().unwrap_or_default(),
        row.inventory_item_id.clone().unwrap_or_default(),
        row.session_term_id.clone().unwrap_or_default(),
    )
}

proptest! {
    #![proptest_config(Config::with_cases(256))]

    #[test]
    fn consolidation_is_deterministic(rows in prop::collection::vec(any_row(), 0..24)) {
        let first = consolidate(&rows, KeyEncoding::Tuple);
        let second = consolidate(&rows, KeyEncoding::Tuple);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn quantity_is_conserved(rows in prop::collection::vec(valid_row(), 0..24)) {
        let outcome = consolidate(&rows, KeyEncoding::Tuple);
        let input: i64 = rows.iter().map(|r| r.quantity.unwrap_or_default()).sum();
        let output: i64 = outcome.records.iter().map(|r| r.quantity).sum();
        prop_assert_eq!(input, output);
    }

    #[test]
    fn large_totals_are_exact_or_rejected(
        rows in prop::collection::vec(
            (valid_row(), (i64::MAX / 4)..=i64::MAX).prop_map(|(mut r, q)| { r.quantity = Some(q); r }),
            0..8,
        )
    ) {
        let outcome = consolidate(&rows, KeyEncoding::Tuple);
        if outcome.is_valid() {
            let input: i128 = rows.iter().map(|r| i128::from(r.quantity.unwrap_or_default())).sum();
            let output: i128 = outcome.records.iter().map(|r| i128::from(r.quantity)).sum();
            prop_assert_eq!(input, output);
        } else {
            prop_assert!(outcome.records.is_empty());
            prop_assert!(outcome.merge_notices.is_empty());
        }
    }

    #[test]
    fn output_keys_are_unique(rows in prop::collection::vec(valid_row(), 0..24)) {
        let outcome = consolidate(&rows, KeyEncoding::Tuple);
        let mut keys = HashSet::new();
        for record in &outcome.records {
            let key: Vec<String> = record.key_fields().into_iter().map(String::from).collect();
            prop_assert!(keys.insert(key));
        }
    }

    #[test]
    fn any_invalid_row_rejects_everything(rows in prop::collection::vec(any_row(), 0..24)) {
        let outcome = consolidate(&rows, KeyEncoding::Tuple);
        if !outcome.invalid_row_positions.is_empty() {
            prop_assert!(outcome.records.is_empty());
            prop_assert!(outcome.merge_notices.is_empty());
        }
        // Positions are 1-based, ascending and in range
        for pair in outcome.invalid_row_positions.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        for &position in &outcome.invalid_row_positions {
            prop_assert!(position >= 1 && position <= rows.len());
        }
    }

    #[test]
    fn records_follow_first_seen_order(rows in prop::collection::vec(valid_row(), 0..24)) {
        let outcome = consolidate(&rows, KeyEncoding::Tuple);

        let mut expected = Vec::new();
        let mut seen = HashSet::new();
        for row in &rows {
            let key = key_of(row);
            if seen.insert(key.clone()) {
                expected.push(key);
            }
        }

        let actual: Vec<_> = outcome
            .records
            .iter()
            .map(|r| (r.class_id.clone(), r.inventory_item_id.clone(), r.session_term_id.clone()))
            .collect();
        prop_assert_eq!(actual, expected);
        prop_assert_eq!(outcome.merge_notices.len(), rows.len() - outcome.records.len());
    }

    #[test]
    fn latest_row_scalars_win(rows in prop::collection::vec(valid_row(), 1..24)) {
        let outcome = consolidate(&rows, KeyEncoding::Tuple);

        for record in &outcome.records {
            let record_key = (
                record.class_id.clone(),
                record.inventory_item_id.clone(),
                record.session_term_id.clone(),
            );
            let last = rows
                .iter()
                .rev()
                .find(|r| key_of(r) == record_key)
                .expect("record key comes from some row");
            prop_assert_eq!(&record.notes, &last.notes);
            prop_assert_eq!(Some(&record.created_by), last.created_by.as_ref());
        }
    }
}
