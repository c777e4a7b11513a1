//! # Orderer Configuration Transactions
//!
//! Validates configuration envelopes and owns each chain's accepted
//! configuration.
//!
//! A configuration envelope is a complete snapshot of a chain's items with a
//! sequence number. [`validate`] decides, without side effects, whether a
//! snapshot may replace the current state:
//!
//! 1. Every item belongs to the chain, and no key appears twice
//! 2. The sequence is exactly one past the current one
//! 3. No existing item is dropped
//! 4. At least one item changed
//! 5. Changed items carry the new sequence; unchanged items are byte-identical
//! 6. Every changed item satisfies its modification policy
//!
//! The first failing check is reported. [`ConfigurationManager`] serializes
//! proposals per chain and swaps in the new state only on success.

pub mod error;
pub mod manager;
pub mod state;

pub use error::{ConfigError, Result};
pub use manager::{ConfigurationManager, StagedConfiguration};
pub use state::{validate, ChainConfig};
