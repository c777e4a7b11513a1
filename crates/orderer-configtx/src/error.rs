//! Error types for configuration validation.

use thiserror::Error;

use orderer_core::{ChainId, CoreError, ItemKey, Status};
use orderer_policy::PolicyError;

/// Why a configuration envelope was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An item's header names another chain.
    #[error("item {item} belongs to chain {found}, expected {expected}")]
    ChainMismatch {
        item: ItemKey,
        expected: ChainId,
        found: ChainId,
    },

    /// The same key appears twice in one envelope.
    #[error("duplicate item {0}")]
    DuplicateItem(ItemKey),

    /// The envelope's sequence is not the successor of the current one.
    #[error("expected sequence {expected}, got {found}")]
    BadSequence { expected: u64, found: u64 },

    /// The current sequence has no successor.
    #[error("sequence {0} cannot be advanced")]
    SequenceExhausted(u64),

    /// The chain moved on between validation and installation.
    #[error("configuration staged at sequence {staged_from} but chain is at {current}")]
    Superseded { staged_from: u64, current: u64 },

    /// An item of the current configuration is missing from the envelope.
    #[error("item {0} was omitted")]
    MissingItem(ItemKey),

    /// Nothing changed relative to the current configuration.
    #[error("configuration envelope changes no item")]
    NoChange,

    /// A changed item does not carry the envelope's sequence.
    #[error("item {item} has last_modified {last_modified}, expected {sequence}")]
    BadLastModified {
        item: ItemKey,
        last_modified: u64,
        sequence: u64,
    },

    /// An item kept its last_modified but its contents differ.
    #[error("item {0} changed without updating last_modified")]
    ItemMutated(ItemKey),

    /// A Policy-typed item does not hold a valid policy.
    #[error("invalid policy: {0}")]
    InvalidPolicy(#[from] PolicyError),

    /// An item's modification policy is not defined in the envelope.
    #[error("item {item} references unknown policy {policy:?}")]
    UnknownPolicy { item: ItemKey, policy: String },

    /// The signatures on a changed item do not satisfy its policy.
    #[error("item {item} does not satisfy policy {policy:?}")]
    PolicyNotSatisfied { item: ItemKey, policy: String },

    /// No configuration exists for the chain.
    #[error("unknown chain {0}")]
    UnknownChain(ChainId),

    /// The envelope could not be decoded.
    #[error("malformed configuration transaction: {0}")]
    Decode(#[from] CoreError),
}

impl ConfigError {
    /// Wire status for this rejection.
    pub fn status(&self) -> Status {
        match self {
            ConfigError::PolicyNotSatisfied { .. } => Status::Forbidden,
            ConfigError::UnknownChain(_) => Status::NotFound,
            _ => Status::BadRequest,
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
