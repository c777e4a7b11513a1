//! # Orderer Ledger
//!
//! The append-only block log of a chain.
//!
//! ## Overview
//!
//! A ledger has a single writer (the chain's ordering backend) and any
//! number of readers. Block numbers are dense and start at the genesis
//! block 0. Visibility only grows: once a reader has seen block N it will
//! eventually see N+1, and never be told N is gone.
//!
//! ## Key Types
//!
//! - [`BlockLedger`] - The async trait every ledger implements
//! - [`BlockCursor`] - A reader position that suspends until the next block exists
//! - [`MemoryLedger`] - In-memory ledger with bounded retention
//! - [`SqliteLedger`] - SQLite-backed persistent ledger
//!
//! ## Waiting for Blocks
//!
//! Each ledger publishes its height on a `tokio::sync::watch` channel.
//! A cursor marks the current height as seen before it looks for its next
//! block, so an append that lands between the look and the wait still wakes
//! it. Waiting is cancel-safe: dropping a `next_block` future leaves the
//! cursor where it was.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{LedgerError, Result};
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;
pub use traits::{resolve_start, BlockCursor, BlockLedger, ReadOutcome, StartPosition};
