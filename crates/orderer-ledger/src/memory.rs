//! In-memory implementation of the BlockLedger trait.
//!
//! Blocks are kept as a singly linked list of nodes with a deque indexing
//! the retained ones. Pruning only drops nodes from the index: a cursor
//! holds the node it last read, and through the links every later node, so
//! a slow reader keeps reading in order after its blocks leave retention.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use orderer_core::{Block, Envelope};

use crate::error::{LedgerError, Result};
use crate::traits::{resolve_start, BlockCursor, BlockLedger, ReadOutcome, StartPosition};

struct Node {
    block: Arc<Block>,
    next: OnceLock<Arc<Node>>,
}

impl Node {
    fn new(block: Block) -> Arc<Self> {
        Arc::new(Self {
            block: Arc::new(block),
            next: OnceLock::new(),
        })
    }
}

impl Drop for Node {
    // Unlink iteratively; a long unreferenced tail would otherwise drop recursively
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(node) = next {
            next = match Arc::try_unwrap(node) {
                Ok(mut node) => node.next.take(),
                Err(_) => None,
            };
        }
    }
}

struct MemoryInner {
    /// Retained nodes, oldest first. Never empty.
    retained: VecDeque<Arc<Node>>,
}

impl MemoryInner {
    fn oldest(&self) -> u64 {
        self.retained.front().map_or(0, |node| node.block.number())
    }

    fn height(&self) -> u64 {
        self.retained.back().map_or(0, |node| node.block.number() + 1)
    }
}

/// In-memory ledger.
///
/// All blocks are lost when the ledger is dropped. At most `max_blocks`
/// blocks are retained; `None` keeps everything.
pub struct MemoryLedger {
    inner: Mutex<MemoryInner>,
    height_tx: watch::Sender<u64>,
    max_blocks: Option<usize>,
}

impl MemoryLedger {
    /// Create a ledger holding `genesis` as block 0.
    pub fn new(genesis: Block, max_blocks: Option<usize>) -> Self {
        let height = genesis.number() + 1;
        let (height_tx, _) = watch::channel(height);
        let mut retained = VecDeque::new();
        retained.push_back(Node::new(genesis));
        Self {
            inner: Mutex::new(MemoryInner { retained }),
            height_tx,
            max_blocks: max_blocks.map(|max| max.max(1)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|e| LedgerError::Poisoned(e.to_string()))
    }
}

#[async_trait]
impl BlockLedger for MemoryLedger {
    async fn append(&self, data: Vec<Envelope>) -> Result<Arc<Block>> {
        let mut inner = self.lock()?;

        let tail = inner
            .retained
            .back()
            .cloned()
            .ok_or_else(|| LedgerError::InvalidData("ledger has no blocks".into()))?;
        let node = Node::new(Block::next(&tail.block.header, data));
        let block = Arc::clone(&node.block);

        if tail.next.set(Arc::clone(&node)).is_err() {
            return Err(LedgerError::InvalidData(format!(
                "block {} already has a successor",
                tail.block.number()
            )));
        }
        inner.retained.push_back(node);

        if let Some(max) = self.max_blocks {
            while inner.retained.len() > max {
                inner.retained.pop_front();
            }
        }

        let height = inner.height();
        self.height_tx.send_replace(height);
        debug!(number = block.number(), envelopes = block.data.len(), "block appended");
        Ok(block)
    }

    async fn read_block(&self, number: u64) -> Result<ReadOutcome> {
        let inner = self.lock()?;
        if number >= inner.height() {
            return Ok(ReadOutcome::NotYetAvailable);
        }
        let oldest = inner.oldest();
        if number < oldest {
            return Ok(ReadOutcome::Pruned);
        }
        let node = usize::try_from(number - oldest)
            .ok()
            .and_then(|index| inner.retained.get(index))
            .ok_or_else(|| LedgerError::InvalidData(format!("block {number} missing from index")))?;
        Ok(ReadOutcome::Block(Arc::clone(&node.block)))
    }

    async fn height(&self) -> Result<u64> {
        Ok(self.lock()?.height())
    }

    async fn oldest_retained(&self) -> Result<u64> {
        Ok(self.lock()?.oldest())
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.height_tx.subscribe()
    }

    async fn cursor(&self, start: StartPosition) -> Result<Box<dyn BlockCursor>> {
        let inner = self.lock()?;
        let oldest = inner.oldest();
        let height = inner.height();
        let number = resolve_start(start, oldest, height)?;

        let slot = if number == height {
            let tail = inner
                .retained
                .back()
                .ok_or_else(|| LedgerError::InvalidData("ledger has no blocks".into()))?;
            Slot::After(Arc::clone(tail))
        } else {
            let node = usize::try_from(number - oldest)
                .ok()
                .and_then(|index| inner.retained.get(index))
                .ok_or_else(|| LedgerError::InvalidData(format!("block {number} missing from index")))?;
            Slot::At(Arc::clone(node))
        };

        Ok(Box::new(MemoryCursor {
            slot,
            position: number,
            height_rx: self.height_tx.subscribe(),
        }))
    }
}

enum Slot {
    /// The next block to return.
    At(Arc<Node>),
    /// The last block returned; the next one is its successor.
    After(Arc<Node>),
}

struct MemoryCursor {
    slot: Slot,
    position: u64,
    height_rx: watch::Receiver<u64>,
}

#[async_trait]
impl BlockCursor for MemoryCursor {
    fn position(&self) -> u64 {
        self.position
    }

    async fn next_block(&mut self) -> Result<Arc<Block>> {
        loop {
            self.height_rx.borrow_and_update();

            let ready = match &self.slot {
                Slot::At(node) => Some(Arc::clone(node)),
                Slot::After(prev) => prev.next.get().cloned(),
            };
            if let Some(node) = ready {
                let block = Arc::clone(&node.block);
                self.slot = Slot::After(node);
                self.position += 1;
                return Ok(block);
            }

            self.height_rx
                .changed()
                .await
                .map_err(|_| LedgerError::Closed)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use orderer_core::{ChainId, ConfigurationEnvelope};

    fn chain() -> ChainId {
        ChainId::from("mem")
    }

    fn genesis() -> Block {
        let tx = Envelope::configuration(chain(), &ConfigurationEnvelope::new(1, vec![])).unwrap();
        Block::genesis(tx)
    }

    fn msg(i: u64) -> Vec<Envelope> {
        vec![Envelope::message(chain(), format!("tx-{i}").into_bytes())]
    }

    async fn ledger_with(blocks: u64, max_blocks: Option<usize>) -> MemoryLedger {
        let ledger = MemoryLedger::new(genesis(), max_blocks);
        for i in 1..=blocks {
            ledger.append(msg(i)).await.unwrap();
        }
        ledger
    }

    #[tokio::test]
    async fn test_append_links_blocks() {
        let ledger = ledger_with(3, None).await;
        assert_eq!(ledger.height().await.unwrap(), 4);

        let mut prev = genesis().header;
        for n in 1..4 {
            let ReadOutcome::Block(block) = ledger.read_block(n).await.unwrap() else {
                panic!("block {n} missing");
            };
            assert!(block.follows(&prev));
            assert!(block.verify_data_hash());
            prev = block.header.clone();
        }
    }

    #[tokio::test]
    async fn test_read_outcomes() {
        let ledger = ledger_with(5, Some(3)).await;
        assert_eq!(ledger.oldest_retained().await.unwrap(), 3);
        assert_eq!(ledger.read_block(2).await.unwrap(), ReadOutcome::Pruned);
        assert!(matches!(ledger.read_block(3).await.unwrap(), ReadOutcome::Block(b) if b.number() == 3));
        assert_eq!(ledger.read_block(6).await.unwrap(), ReadOutcome::NotYetAvailable);
    }

    #[tokio::test]
    async fn test_specified_cursor_starts_at_number() {
        let ledger = ledger_with(5, None).await;
        let mut cursor = ledger.cursor(StartPosition::Specified(2)).await.unwrap();
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.next_block().await.unwrap().number(), 2);
        assert_eq!(cursor.next_block().await.unwrap().number(), 3);
        assert_eq!(cursor.position(), 4);
    }

    #[tokio::test]
    async fn test_oldest_and_newest() {
        let ledger = ledger_with(5, Some(2)).await;
        let mut oldest = ledger.cursor(StartPosition::Oldest).await.unwrap();
        assert_eq!(oldest.next_block().await.unwrap().number(), 4);
        let mut newest = ledger.cursor(StartPosition::Newest).await.unwrap();
        assert_eq!(newest.next_block().await.unwrap().number(), 5);
    }

    #[tokio::test]
    async fn test_cursor_out_of_range() {
        let ledger = ledger_with(5, Some(2)).await;
        assert!(matches!(
            ledger.cursor(StartPosition::Specified(7)).await,
            Err(LedgerError::BeyondHeight { number: 7, height: 6 })
        ));
        assert!(matches!(
            ledger.cursor(StartPosition::Specified(1)).await,
            Err(LedgerError::Pruned { number: 1, oldest: 4 })
        ));
    }

    #[tokio::test]
    async fn test_cursor_waits_for_append() {
        let ledger = Arc::new(ledger_with(1, None).await);
        let mut cursor = ledger.cursor(StartPosition::Specified(2)).await.unwrap();

        let writer = Arc::clone(&ledger);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.append(msg(2)).await.unwrap();
        });

        let block = tokio::time::timeout(Duration::from_secs(5), cursor.next_block())
            .await
            .expect("cursor never woke")
            .unwrap();
        assert_eq!(block.number(), 2);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_wait_does_not_move_cursor() {
        let ledger = ledger_with(1, None).await;
        let mut cursor = ledger.cursor(StartPosition::Specified(2)).await.unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(10), cursor.next_block()).await;
        assert!(waited.is_err());
        assert_eq!(cursor.position(), 2);

        ledger.append(msg(2)).await.unwrap();
        assert_eq!(cursor.next_block().await.unwrap().number(), 2);
    }

    #[tokio::test]
    async fn test_cursor_survives_pruning() {
        let ledger = ledger_with(2, Some(2)).await;
        let mut cursor = ledger.cursor(StartPosition::Oldest).await.unwrap();
        assert_eq!(cursor.next_block().await.unwrap().number(), 1);

        for i in 3..10 {
            ledger.append(msg(i)).await.unwrap();
        }
        assert_eq!(ledger.oldest_retained().await.unwrap(), 8);

        // The reader fell behind retention but still sees every block in order
        for expected in 2..10 {
            assert_eq!(cursor.next_block().await.unwrap().number(), expected);
        }
    }

    #[tokio::test]
    async fn test_dropping_ledger_closes_waiters() {
        let ledger = ledger_with(0, None).await;
        let mut cursor = ledger.cursor(StartPosition::Specified(1)).await.unwrap();
        drop(ledger);
        assert!(matches!(cursor.next_block().await, Err(LedgerError::Closed)));
    }

    #[tokio::test]
    async fn test_long_unreferenced_chain_drops() {
        let ledger = ledger_with(0, Some(1)).await;
        let cursor = ledger.cursor(StartPosition::Oldest).await.unwrap();
        for i in 1..=50_000 {
            ledger.append(msg(i)).await.unwrap();
        }
        drop(cursor);
        assert_eq!(ledger.height().await.unwrap(), 50_001);
    }
}
