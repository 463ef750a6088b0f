//! Class inventory entitlement rows
//!
//! Composite key: `(class_id, inventory_item_id, session_term_id)`.
//! Acting user: `created_by`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{
    normalize_text, optional, parse_quantity, require, require_quantity, BulkRecord, BulkRow,
    RowDefect, RowKind,
};
use crate::{Error, Result};

/// Draft class entitlement row as edited by the operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassEntitlementRow {
    pub class_id: Option<String>,
    pub inventory_item_id: Option<String>,
    pub session_term_id: Option<String>,
    pub quantity: Option<i64>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

/// Editable fields of [`ClassEntitlementRow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassEntitlementField {
    ClassId,
    InventoryItemId,
    SessionTermId,
    Quantity,
    Notes,
    CreatedBy,
}

impl ClassEntitlementField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassId => "class_id",
            Self::InventoryItemId => "inventory_item_id",
            Self::SessionTermId => "session_term_id",
            Self::Quantity => "quantity",
            Self::Notes => "notes",
            Self::CreatedBy => "created_by",
        }
    }
}

impl fmt::Display for ClassEntitlementField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassEntitlementField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "class_id" => Ok(Self::ClassId),
            "inventory_item_id" => Ok(Self::InventoryItemId),
            "session_term_id" => Ok(Self::SessionTermId),
            "quantity" => Ok(Self::Quantity),
            "notes" => Ok(Self::Notes),
            "created_by" => Ok(Self::CreatedBy),
            _ => Err(Error::InvalidInput(format!(
                "Unknown class entitlement field: {}",
                s
            ))),
        }
    }
}

/// Consolidated class entitlement, one per composite key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntitlementRecord {
    pub class_id: String,
    pub inventory_item_id: String,
    pub session_term_id: String,
    pub quantity: i64,
    pub notes: Option<String>,
    pub created_by: String,
}

impl BulkRecord for ClassEntitlementRecord {
    fn key_fields(&self) -> Vec<&str> {
        vec![
            self.class_id.as_str(),
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
        self.created_by = later.created_by;
        Some(total)
    }
}

impl BulkRow for ClassEntitlementRow {
    type Field = ClassEntitlementField;
    type Record = ClassEntitlementRecord;

    const KIND: RowKind = RowKind::ClassEntitlement;

    fn to_record(&self) -> std::result::Result<ClassEntitlementRecord, Vec<RowDefect>> {
        let mut defects = Vec::new();

        let class_id = require(&self.class_id, "class_id", &mut defects);
        let inventory_item_id = require(&self.inventory_item_id, "inventory_item_id", &mut defects);
        let session_term_id = require(&self.session_term_id, "session_term_id", &mut defects);
        let quantity = require_quantity(self.quantity, &mut defects);
        let created_by = require(&self.created_by, "created_by", &mut defects);

        if !defects.is_empty() {
            return Err(defects);
        }

        Ok(ClassEntitlementRecord {
            class_id,
            inventory_item_id,
            session_term_id,
            quantity,
            notes: optional(&self.notes),
            created_by,
        })
    }

    fn set_field(&mut self, field: ClassEntitlementField, value: &str) -> Result<()> {
        match field {
            ClassEntitlementField::ClassId => self.class_id = normalize_text(value),
            ClassEntitlementField::InventoryItemId => self.inventory_item_id = normalize_text(value),
            ClassEntitlementField::SessionTermId => self.session_term_id = normalize_text(value),
            ClassEntitlementField::Quantity => self.quantity = parse_quantity(value)?,
            ClassEntitlementField::Notes => self.notes = normalize_text(value),
            ClassEntitlementField::CreatedBy => self.created_by = normalize_text(value),
        }
        Ok(())
    }
}
