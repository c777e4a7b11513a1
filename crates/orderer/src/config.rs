//! Orderer configuration.
//!
//! Every section has a default, so a configuration file only needs the
//! fields it changes:
//!
//! ```json
//! {
//!   "batch": { "max_message_count": 50, "batch_timeout_ms": 250 },
//!   "ledger": { "kind": "sqlite", "directory": "/var/lib/orderer" }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use orderer_core::MAX_MESSAGE_BYTES;
use orderer_deliver::DeliverConfig;
use orderer_policy::PolicyConfig;

use crate::error::Result;

/// Limits applied at Broadcast ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Maximum size of an envelope's data.
    pub max_message_bytes: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: MAX_MESSAGE_BYTES,
        }
    }
}

/// When the solo backend cuts a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Cut as soon as this many envelopes are pending.
    pub max_message_count: usize,
    /// Cut this long after the first envelope of a batch arrived.
    pub batch_timeout_ms: u64,
    /// Envelopes admitted but not yet ordered; a full queue rejects.
    pub queue_capacity: usize,
}

impl BatchConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_message_count: 10,
            batch_timeout_ms: 2_000,
            queue_capacity: 1_000,
        }
    }
}

/// Where each chain's blocks are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerConfig {
    /// In memory, optionally keeping only the newest `max_blocks`.
    Memory {
        #[serde(default)]
        max_blocks: Option<usize>,
    },
    /// One SQLite database per chain under `directory`.
    Sqlite { directory: PathBuf },
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig::Memory { max_blocks: None }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdererConfig {
    pub policy: PolicyConfig,
    pub deliver: DeliverConfig,
    pub broadcast: BroadcastConfig,
    pub batch: BatchConfig,
    pub ledger: LedgerConfig,
}

impl OrdererConfig {
    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
