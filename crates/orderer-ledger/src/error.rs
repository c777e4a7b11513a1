//! Error types for the ledger module.

use thiserror::Error;

use orderer_core::{CoreError, Status};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Block serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] CoreError),

    /// A requested start position is past the next block to be written.
    #[error("block {number} is beyond height {height}")]
    BeyondHeight { number: u64, height: u64 },

    /// A requested start position is older than the retention horizon.
    #[error("block {number} was pruned; oldest retained is {oldest}")]
    Pruned { number: u64, oldest: u64 },

    /// The stored chain does not start with the expected genesis block.
    #[error("stored genesis block does not match")]
    GenesisMismatch,

    /// The ledger was shut down while a reader was waiting.
    #[error("ledger closed")]
    Closed,

    /// A lock guarding ledger state was poisoned.
    #[error("ledger state poisoned: {0}")]
    Poisoned(String),

    /// A blocking storage task failed to complete.
    #[error("storage task failed: {0}")]
    Task(String),

    /// Stored data is inconsistent.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

impl LedgerError {
    /// Wire status reported to a reader that hits this error.
    pub fn status(&self) -> Status {
        match self {
            LedgerError::BeyondHeight { .. } | LedgerError::Pruned { .. } => Status::NotFound,
            _ => Status::ServiceUnavailable,
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
