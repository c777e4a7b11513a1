//! Error types for the orderer.

use thiserror::Error;

use orderer_configtx::ConfigError;
use orderer_core::{ChainId, Status};
use orderer_ledger::LedgerError;

/// Errors from setting up and managing chains.
#[derive(Debug, Error)]
pub enum OrdererError {
    /// The configuration file is not valid JSON for [`OrdererConfig`](crate::OrdererConfig).
    #[error("invalid orderer configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Ledger error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The chain configuration was rejected.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The genesis block is not a lone configuration transaction at block 0.
    #[error("invalid genesis block: {0}")]
    InvalidGenesis(String),

    /// The chain has already been bootstrapped.
    #[error("chain already exists: {0}")]
    ChainExists(ChainId),

    /// The chain id cannot name a chain.
    #[error("invalid chain id: {0:?}")]
    InvalidChainId(ChainId),

    /// No configuration transaction is retained on the chain's ledger.
    #[error("no configuration found on ledger of chain {0}")]
    ConfigurationNotFound(ChainId),
}

impl OrdererError {
    pub fn status(&self) -> Status {
        match self {
            OrdererError::Ledger(e) => e.status(),
            OrdererError::Configuration(e) => e.status(),
            OrdererError::Config(_)
            | OrdererError::InvalidGenesis(_)
            | OrdererError::ChainExists(_)
            | OrdererError::InvalidChainId(_) => Status::BadRequest,
            OrdererError::Io(_) | OrdererError::ConfigurationNotFound(_) => {
                Status::InternalServerError
            }
        }
    }
}

/// Result type for orderer operations.
pub type Result<T> = std::result::Result<T, OrdererError>;

/// Why an ordering backend did not admit an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The admission queue is at capacity.
    #[error("ordering queue is full")]
    QueueFull,

    /// The backend is no longer ordering.
    #[error("ordering backend has stopped")]
    Stopped,
}

impl SubmitError {
    pub fn status(&self) -> Status {
        Status::ServiceUnavailable
    }
}
