//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur when naming, encoding or decoding attribute kinds.
///
/// Malformed `json` payloads are deliberately absent from this list: they
/// degrade to [`crate::Value::Null`] with a warning instead of failing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The kind name is not one of the supported attribute kinds.
    #[error("type {name} not supported, only {supported} are supported")]
    UnsupportedKind {
        /// The rejected kind name.
        name: String,
        /// Comma separated list of the supported kind names.
        supported: String,
    },

    /// The kind is a collection and has no scalar encoding.
    #[error("{kind} attributes have no scalar encoding")]
    NotScalar {
        /// Name of the collection kind.
        kind: &'static str,
    },
}

impl CodecError {
    /// Create an unsupported kind error.
    pub fn unsupported_kind(name: impl Into<String>) -> Self {
        Self::UnsupportedKind {
            name: name.into(),
            supported: crate::AttrKind::ALL
                .iter()
                .map(|kind| kind.name())
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Create a not-scalar error for the given kind.
    pub fn not_scalar(kind: crate::AttrKind) -> Self {
        Self::NotScalar { kind: kind.name() }
    }
}
