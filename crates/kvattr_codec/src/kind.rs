//! Attribute kinds.

use crate::error::{CodecError, CodecResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The declared kind of a remote attribute.
///
/// Every kind except [`AttrKind::SortedSet`] is stored as a single string
/// value under its key. Sorted sets live in the store's sorted-set keyspace
/// and are never cached locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrKind {
    /// Plain text.
    String,
    /// Signed 64-bit integer, stored in decimal.
    Integer,
    /// Boolean, stored as `"t"` / `"f"`.
    Boolean,
    /// JSON array or object.
    Json,
    /// Member/score collection.
    SortedSet,
}

impl AttrKind {
    /// All supported kinds, in declaration order.
    pub const ALL: [AttrKind; 5] = [
        AttrKind::String,
        AttrKind::Integer,
        AttrKind::Boolean,
        AttrKind::Json,
        AttrKind::SortedSet,
    ];

    /// Returns the canonical name of this kind.
    pub const fn name(self) -> &'static str {
        match self {
            AttrKind::String => "string",
            AttrKind::Integer => "integer",
            AttrKind::Boolean => "boolean",
            AttrKind::Json => "json",
            AttrKind::SortedSet => "sorted_set",
        }
    }

    /// Returns true if values of this kind are stored as a single string.
    pub const fn is_scalar(self) -> bool {
        !matches!(self, AttrKind::SortedSet)
    }

    /// Parses a kind name, failing for anything unsupported.
    pub fn parse(name: &str) -> CodecResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| CodecError::unsupported_kind(name))
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttrKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
