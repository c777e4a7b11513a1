//! Deliver protocol message types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use orderer_core::{Block, ChainId, Status};
use orderer_ledger::StartPosition;

/// Where a seek starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeekStart {
    /// The chain head at the instant the seek is processed.
    Newest,
    /// The oldest retained block.
    Oldest,
    /// `SeekInfo::specified_number`.
    Specified,
}

/// A request to (re)position the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekInfo {
    pub chain_id: ChainId,
    pub start: SeekStart,
    /// Only meaningful with [`SeekStart::Specified`].
    pub specified_number: u64,
    /// Maximum unacknowledged blocks in flight; 0 means unlimited.
    pub window_size: u64,
}

impl SeekInfo {
    pub fn newest(chain_id: impl Into<ChainId>, window_size: u64) -> Self {
        Self {
            chain_id: chain_id.into(),
            start: SeekStart::Newest,
            specified_number: 0,
            window_size,
        }
    }

    pub fn oldest(chain_id: impl Into<ChainId>, window_size: u64) -> Self {
        Self {
            chain_id: chain_id.into(),
            start: SeekStart::Oldest,
            specified_number: 0,
            window_size,
        }
    }

    pub fn specified(chain_id: impl Into<ChainId>, number: u64, window_size: u64) -> Self {
        Self {
            chain_id: chain_id.into(),
            start: SeekStart::Specified,
            specified_number: number,
            window_size,
        }
    }

    /// The ledger start position this seek asks for.
    pub fn start_position(&self) -> StartPosition {
        match self.start {
            SeekStart::Newest => StartPosition::Newest,
            SeekStart::Oldest => StartPosition::Oldest,
            SeekStart::Specified => StartPosition::Specified(self.specified_number),
        }
    }
}

/// Client-to-server messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliverUpdate {
    /// Every block up to and including `number` was received.
    Acknowledgement { number: u64 },
    /// Reposition the stream.
    Seek(SeekInfo),
}

/// Server-to-client messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliverResponse {
    /// Terminal: the stream is closed after this.
    Error(Status),
    Block(Arc<Block>),
}

impl DeliverResponse {
    pub fn block(&self) -> Option<&Arc<Block>> {
        match self {
            DeliverResponse::Block(block) => Some(block),
            DeliverResponse::Error(_) => None,
        }
    }
}
