//! Error types for store and pool operations.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for pool registry setup and lookup.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur while talking to the store.
///
/// None of these are retried by this crate.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred on the connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store could not be reached.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// No pooled connection became free before the pool timeout.
    #[error("timed out after {timeout:?} waiting for a connection from pool {pool}")]
    PoolTimeout {
        /// Name of the exhausted pool.
        pool: String,
        /// The configured checkout timeout.
        timeout: Duration,
    },

    /// The peer sent something that is not valid for the protocol.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the violation.
        message: String,
    },

    /// The store rejected a command.
    #[error("server error: {message}")]
    Server {
        /// Error text sent by the server.
        message: String,
    },
}

impl StoreError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Returns true if the connection that produced this error can no
    /// longer be trusted and must not go back into its pool.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            StoreError::Io(_) | StoreError::Unavailable { .. } | StoreError::Protocol { .. }
        )
    }
}

/// Errors raised while building or querying a [`crate::PoolRegistry`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A pool in a multi-pool configuration has no name.
    #[error("pool at index {index} has no name; every pool needs a name when more than one is configured")]
    MissingName {
        /// Position of the offending entry.
        index: usize,
    },

    /// Two pools share a name.
    #[error("pool name {name} is configured more than once")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// No pool is flagged as default.
    #[error("no default pool specified")]
    NoDefault,

    /// More than one pool is flagged as default.
    #[error("only one default pool is allowed, found: {}", names.join(", "))]
    MultipleDefaults {
        /// Names of all pools flagged default.
        names: Vec<String>,
    },

    /// The requested pool does not exist.
    #[error("unknown pool: {name}")]
    UnknownPool {
        /// The requested name.
        name: String,
    },

    /// The configured address could not be understood.
    #[error("invalid store address: {message}")]
    InvalidAddress {
        /// Description of the problem.
        message: String,
    },

    /// A pool option is out of range.
    #[error("invalid pool option: {message}")]
    InvalidOption {
        /// Description of the problem.
        message: String,
    },
}

impl RegistryError {
    /// Creates an invalid address error.
    pub fn invalid_address(message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            message: message.into(),
        }
    }

    /// Creates an invalid option error.
    pub fn invalid_option(message: impl Into<String>) -> Self {
        Self::InvalidOption {
            message: message.into(),
        }
    }
}
