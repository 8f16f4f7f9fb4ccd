//! Error types for kvattr core.

use kvattr_codec::{AttrKind, CodecError};
use kvattr_store::{RegistryError, StoreError};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for schema declaration.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while declaring attributes.
///
/// These are fatal: a schema that fails to build must not be used.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The kind name is not a supported attribute kind.
    #[error(transparent)]
    UnsupportedKind(#[from] CodecError),

    /// A default was given for a collection attribute.
    #[error("attribute {name} is a {kind} and cannot have a default")]
    DefaultOnCollection {
        /// Attribute name.
        name: String,
        /// Its kind.
        kind: AttrKind,
    },

    /// The default does not fit the attribute kind.
    #[error("default for attribute {name} is not a valid {kind}")]
    InvalidDefault {
        /// Attribute name.
        name: String,
        /// Its kind.
        kind: AttrKind,
    },
}

/// Errors that can occur while reading, writing or syncing attributes.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Store or pool failure, including connectivity and checkout timeouts.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Pool lookup failure.
    #[error("pool registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Schema declaration failure.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Codec failure.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The attribute is not declared on the owner type.
    #[error("{owner} has no remote attribute named {name}")]
    UnknownAttribute {
        /// Owner type name.
        owner: String,
        /// The requested attribute.
        name: String,
    },

    /// A scalar operation was attempted on a sorted-set attribute.
    #[error("attribute {name} is a sorted_set; use its sorted set handle instead")]
    NotScalar {
        /// Attribute name.
        name: String,
    },

    /// A sorted-set handle was requested for a scalar attribute.
    #[error("attribute {name} is a {kind}, not a sorted_set")]
    NotSortedSet {
        /// Attribute name.
        name: String,
        /// Its kind.
        kind: AttrKind,
    },

    /// The owner returned no value for its custom identity field.
    #[error("identity field {field} has no value")]
    MissingIdentity {
        /// The configured identity field.
        field: String,
    },
}

impl CoreError {
    /// Create an unknown attribute error.
    pub fn unknown_attribute(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Create a not-scalar error.
    pub fn not_scalar(name: impl Into<String>) -> Self {
        Self::NotScalar { name: name.into() }
    }

    /// Returns true if the error came from the store or its pool.
    pub fn is_store_error(&self) -> bool {
        matches!(self, CoreError::Store(_))
    }
}
