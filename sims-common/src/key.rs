//! Composite business keys
//!
//! A composite key is the ordered tuple of identifier fields a bulk-upsert
//! target treats as unique (for example class, inventory item and session
//! term). Two encodings are supported:
//!
//! - [`KeyEncoding::Tuple`]: the fields are kept as separate parts, so
//!   `("a-b", "c")` and `("a", "b-c")` never collide.
//! - [`KeyEncoding::LegacyJoined`]: the fields are joined with `-` into a
//!   single string. Identifiers that themselves contain `-` can collide.
//!   Only for compatibility with payloads built by older clients.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used by [`KeyEncoding::LegacyJoined`]
pub const LEGACY_SEPARATOR: &str = "-";

/// How composite key fields are combined into a map key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyEncoding {
    /// Keep each field as a separate tuple part (collision-safe)
    #[default]
    Tuple,
    /// Join fields with `-` into one string
    LegacyJoined,
}

impl fmt::Display for KeyEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tuple => write!(f, "tuple"),
            Self::LegacyJoined => write!(f, "legacy-joined"),
        }
    }
}

impl std::str::FromStr for KeyEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tuple" => Ok(Self::Tuple),
            "legacy-joined" | "legacy_joined" => Ok(Self::LegacyJoined),
            _ => Err(format!("unknown key encoding: {}", s)),
        }
    }
}

/// Hashable composite key built from ordered identifier fields
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey(Vec<String>);

impl CompositeKey {
    /// Build a key from ordered fields using the given encoding
    ///
    /// # Examples
    /// ```
    /// use sims_common::key::{CompositeKey, KeyEncoding};
    ///
    /// let a = CompositeKey::encode(&["a-b", "c"], KeyEncoding::Tuple);
    /// let b = CompositeKey::encode(&["a", "b-c"], KeyEncoding::Tuple);
    /// assert_ne!(a, b);
    ///
    /// let a = CompositeKey::encode(&["a-b", "c"], KeyEncoding::LegacyJoined);
    /// let b = CompositeKey::encode(&["a", "b-c"], KeyEncoding::LegacyJoined);
    /// assert_eq!(a, b);
    /// ```
    pub fn encode(fields: &[&str], encoding: KeyEncoding) -> Self {
        match encoding {
            KeyEncoding::Tuple => Self(fields.iter().map(|f| f.to_string()).collect()),
            KeyEncoding::LegacyJoined => Self(vec![fields.join(LEGACY_SEPARATOR)]),
        }
    }

    /// Key parts (one per field for tuple keys, one joined part otherwise)
    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}
