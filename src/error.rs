//! Error types and handling for the transmission buffer pool
//!
//! Two families live here. [`TxBufError`] covers faults detected while
//! building or driving a pool (bad configuration, a failed worker thread).
//! [`ReserveFailure`] covers the ordinary outcomes of a bounded pool under
//! pressure; those are expected and callers retry on a later tick.

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, TxBufError>;

/// Faults raised while creating or driving a pool
#[derive(Debug, thiserror::Error)]
pub enum TxBufError {
    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// A worker thread failed
    #[error("Concurrency error: {message}")]
    Concurrency { message: String },
}

impl TxBufError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a concurrency error
    pub fn concurrency(message: impl Into<String>) -> Self {
        Self::Concurrency {
            message: message.into(),
        }
    }
}

/// Reason a reservation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReserveFailure {
    /// Another handle currently holds the identifier
    #[error("buffer identifier is locked by another handle")]
    IdentifierLocked,

    /// Every reservation slot is occupied
    #[error("no free reservation slot")]
    NoFreeSlot,

    /// The codeblock budget cannot cover the request
    #[error("insufficient codeblocks: requested {requested}, available {available}")]
    InsufficientCodeblocks { requested: usize, available: usize },

    /// The pool has been stopped
    #[error("buffer pool is stopped")]
    PoolStopped,
}

/// The codeblock store could not satisfy a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("codeblock shortage: requested {requested}, available {available}")]
pub struct CodeblockShortage {
    /// Codeblocks the operation needed from the free set
    pub requested: usize,
    /// Codeblocks that were free
    pub available: usize,
}

impl From<CodeblockShortage> for ReserveFailure {
    fn from(shortage: CodeblockShortage) -> Self {
        Self::InsufficientCodeblocks {
            requested: shortage.requested,
            available: shortage.available,
        }
    }
}
