//! SQLite implementation of the BlockLedger trait.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! tokio::spawn_blocking. Nothing is pruned: the oldest retained block is
//! always the genesis block.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::watch;
use tracing::{debug, info};

use orderer_core::{Block, BlockHeader, Envelope};

use crate::error::{LedgerError, Result};
use crate::migration::{self, now_millis};
use crate::traits::{resolve_start, BlockCursor, BlockLedger, ReadOutcome, StartPosition};

struct SqliteInner {
    conn: Connection,
    /// Header of the last block written.
    tail: BlockHeader,
}

/// SQLite-based ledger.
///
/// Thread-safe via internal Mutex. The writer and every cursor share the
/// same connection.
pub struct SqliteLedger {
    inner: Arc<Mutex<SqliteInner>>,
    height_tx: Arc<watch::Sender<u64>>,
}

impl SqliteLedger {
    /// Open a ledger at the given path.
    ///
    /// A new database is initialized with `genesis`; an existing one must
    /// start with the same genesis block.
    pub fn open(path: impl AsRef<Path>, genesis: Block) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn, genesis)
    }

    /// Open an in-memory SQLite ledger.
    pub fn open_memory(genesis: Block) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, genesis)
    }

    fn init(mut conn: Connection, genesis: Block) -> Result<Self> {
        migration::migrate(&mut conn)?;

        match load_block(&conn, 0)? {
            Some(stored) if stored.header != genesis.header => {
                return Err(LedgerError::GenesisMismatch);
            }
            Some(_) => {}
            None => insert_block(&conn, &genesis)?,
        }

        let tail = load_tail(&conn)?;
        let height = tail.number + 1;
        info!(height, "sqlite ledger opened");

        let (height_tx, _) = watch::channel(height);
        Ok(Self {
            inner: Arc::new(Mutex::new(SqliteInner { conn, tail })),
            height_tx: Arc::new(height_tx),
        })
    }
}

/// Run `f` against the locked connection on the blocking pool.
async fn blocking<F, T>(inner: &Arc<Mutex<SqliteInner>>, f: F) -> Result<T>
where
    F: FnOnce(&mut SqliteInner) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let inner = Arc::clone(inner);
    tokio::task::spawn_blocking(move || {
        let mut guard = inner
            .lock()
            .map_err(|e| LedgerError::Poisoned(e.to_string()))?;
        f(&mut guard)
    })
    .await
    .map_err(|e| LedgerError::Task(e.to_string()))?
}

fn insert_block(conn: &Connection, block: &Block) -> Result<()> {
    let body = block.to_bytes()?;
    conn.execute(
        "INSERT INTO blocks (
            number, header_hash, previous_hash, data_hash, envelope_count, body, committed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            block.number() as i64,
            block.header.hash().0.as_slice(),
            block.header.previous_hash.0.as_slice(),
            block.header.data_hash.0.as_slice(),
            block.data.len() as i64,
            body,
            now_millis(),
        ],
    )?;
    Ok(())
}

fn decode_block(number: u64, body: &[u8]) -> Result<Block> {
    let block = Block::from_bytes(body)?;
    if block.number() != number {
        return Err(LedgerError::InvalidData(format!(
            "row {number} holds block {}",
            block.number()
        )));
    }
    Ok(block)
}

fn load_block(conn: &Connection, number: u64) -> Result<Option<Block>> {
    let body: Option<Vec<u8>> = conn
        .query_row(
            "SELECT body FROM blocks WHERE number = ?1",
            params![number as i64],
            |row| row.get(0),
        )
        .optional()?;
    body.map(|body| decode_block(number, &body)).transpose()
}

fn load_tail(conn: &Connection) -> Result<BlockHeader> {
    let (number, body): (i64, Vec<u8>) = conn.query_row(
        "SELECT number, body FROM blocks ORDER BY number DESC LIMIT 1",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(decode_block(number as u64, &body)?.header)
}

#[async_trait]
impl BlockLedger for SqliteLedger {
    async fn append(&self, data: Vec<Envelope>) -> Result<Arc<Block>> {
        let height_tx = Arc::clone(&self.height_tx);
        let block = blocking(&self.inner, move |inner| {
            let block = Block::next(&inner.tail, data);
            insert_block(&inner.conn, &block)?;
            inner.tail = block.header.clone();
            height_tx.send_replace(block.number() + 1);
            Ok(block)
        })
        .await?;
        debug!(number = block.number(), envelopes = block.data.len(), "block appended");
        Ok(Arc::new(block))
    }

    async fn read_block(&self, number: u64) -> Result<ReadOutcome> {
        blocking(&self.inner, move |inner| {
            Ok(match load_block(&inner.conn, number)? {
                Some(block) => ReadOutcome::Block(Arc::new(block)),
                None => ReadOutcome::NotYetAvailable,
            })
        })
        .await
    }

    async fn height(&self) -> Result<u64> {
        blocking(&self.inner, |inner| Ok(inner.tail.number + 1)).await
    }

    async fn oldest_retained(&self) -> Result<u64> {
        Ok(0)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.height_tx.subscribe()
    }

    async fn cursor(&self, start: StartPosition) -> Result<Box<dyn BlockCursor>> {
        let position =
            blocking(&self.inner, move |inner| resolve_start(start, 0, inner.tail.number + 1))
                .await?;
        Ok(Box::new(SqliteCursor {
            inner: Arc::clone(&self.inner),
            position,
            height_rx: self.height_tx.subscribe(),
        }))
    }
}

struct SqliteCursor {
    inner: Arc<Mutex<SqliteInner>>,
    position: u64,
    height_rx: watch::Receiver<u64>,
}

#[async_trait]
impl BlockCursor for SqliteCursor {
    fn position(&self) -> u64 {
        self.position
    }

    async fn next_block(&mut self) -> Result<Arc<Block>> {
        loop {
            let height = *self.height_rx.borrow_and_update();
            if height > self.position {
                let number = self.position;
                let block = blocking(&self.inner, move |inner| load_block(&inner.conn, number))
                    .await?
                    .ok_or_else(|| {
                        LedgerError::InvalidData(format!("block {number} below height is missing"))
                    })?;
                self.position += 1;
                return Ok(Arc::new(block));
            }

            self.height_rx
                .changed()
                .await
                .map_err(|_| LedgerError::Closed)?;
        }
    }
}
