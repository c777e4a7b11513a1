//! Deliver stream configuration.

use serde::{Deserialize, Serialize};

/// What to do with an acknowledgement below the window base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleAck {
    /// Close the stream with BAD_REQUEST.
    #[default]
    Reject,
    /// Drop the acknowledgement and carry on.
    Ignore,
}

/// Configuration for Deliver streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverConfig {
    pub stale_ack: StaleAck,
    /// Client updates buffered between the reader and producer tasks.
    pub update_buffer: usize,
}

impl Default for DeliverConfig {
    fn default() -> Self {
        Self {
            stale_ack: StaleAck::Reject,
            update_buffer: 16,
        }
    }
}
