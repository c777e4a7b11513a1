//! Error types for the deliver module.

use thiserror::Error;

use orderer_core::{ChainId, Status};
use orderer_ledger::LedgerError;

/// Reasons a Deliver stream is terminated by the server.
#[derive(Debug, Error)]
pub enum DeliverError {
    /// The client broke the protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The seek names a chain this service does not serve.
    #[error("unknown chain {0}")]
    UnknownChain(ChainId),

    /// The client may not read the chain.
    #[error("read access to chain {0} denied")]
    Forbidden(ChainId),

    /// The ledger could not position or advance the cursor.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl DeliverError {
    /// Status sent in the terminal error response.
    pub fn status(&self) -> Status {
        match self {
            DeliverError::Protocol(_) => Status::BadRequest,
            DeliverError::UnknownChain(_) => Status::NotFound,
            DeliverError::Forbidden(_) => Status::Forbidden,
            DeliverError::Ledger(e) => e.status(),
        }
    }
}

/// Result type for deliver operations.
pub type Result<T> = std::result::Result<T, DeliverError>;
