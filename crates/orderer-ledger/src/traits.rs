//! The ledger and cursor traits.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use orderer_core::{Block, Envelope};

use crate::error::{LedgerError, Result};

/// Result of reading a block by number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Block(Arc<Block>),
    /// Not written yet.
    NotYetAvailable,
    /// Dropped by retention.
    Pruned,
}

/// Where a cursor starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// The oldest retained block.
    Oldest,
    /// The head at the moment the cursor is created.
    Newest,
    /// A given block number.
    Specified(u64),
}

/// Resolve a start position against a ledger's bounds.
///
/// `height` is the number of the next block to be written; since every
/// chain has a genesis block it is at least 1. A specified start equal to
/// `height` is valid and waits for the next append.
pub fn resolve_start(start: StartPosition, oldest: u64, height: u64) -> Result<u64> {
    match start {
        StartPosition::Oldest => Ok(oldest),
        StartPosition::Newest => Ok(height.saturating_sub(1)),
        StartPosition::Specified(number) if number > height => {
            Err(LedgerError::BeyondHeight { number, height })
        }
        StartPosition::Specified(number) if number < oldest => {
            Err(LedgerError::Pruned { number, oldest })
        }
        StartPosition::Specified(number) => Ok(number),
    }
}

/// An append-only, single-writer block log.
///
/// # Design Notes
///
/// - **Dense numbering**: `append` assigns the next number and links the new
///   block to the previous header.
/// - **Atomic positioning**: `cursor` resolves its start under the same
///   critical section as `append`, so `Newest` is exactly the head at that
///   instant.
/// - **Height watch**: `subscribe` publishes the height after every append.
#[async_trait]
pub trait BlockLedger: Send + Sync {
    /// Append a block carrying `data`.
    async fn append(&self, data: Vec<Envelope>) -> Result<Arc<Block>>;

    /// Read a block by number.
    async fn read_block(&self, number: u64) -> Result<ReadOutcome>;

    /// Number of the next block to be written.
    async fn height(&self) -> Result<u64>;

    /// Number of the oldest block still readable.
    async fn oldest_retained(&self) -> Result<u64>;

    /// Watch the ledger height.
    fn subscribe(&self) -> watch::Receiver<u64>;

    /// Open a cursor at `start`.
    async fn cursor(&self, start: StartPosition) -> Result<Box<dyn BlockCursor>>;
}

/// A reader's position in a ledger.
#[async_trait]
pub trait BlockCursor: Send {
    /// Number of the block the next call to `next_block` returns.
    fn position(&self) -> u64;

    /// Return the next block, suspending until it has been appended.
    ///
    /// Cancel-safe: if the returned future is dropped before completion, the
    /// cursor has not moved.
    async fn next_block(&mut self) -> Result<Arc<Block>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_start() {
        assert_eq!(resolve_start(StartPosition::Oldest, 3, 10).unwrap(), 3);
        assert_eq!(resolve_start(StartPosition::Newest, 3, 10).unwrap(), 9);
        assert_eq!(resolve_start(StartPosition::Specified(5), 3, 10).unwrap(), 5);
        assert_eq!(resolve_start(StartPosition::Specified(10), 3, 10).unwrap(), 10);
    }

    #[test]
    fn test_resolve_start_out_of_range() {
        assert!(matches!(
            resolve_start(StartPosition::Specified(11), 0, 10),
            Err(LedgerError::BeyondHeight { number: 11, height: 10 })
        ));
        let err = resolve_start(StartPosition::Specified(2), 3, 10).unwrap_err();
        assert!(matches!(err, LedgerError::Pruned { number: 2, oldest: 3 }));
        assert_eq!(err.status(), orderer_core::Status::NotFound);
    }
}
