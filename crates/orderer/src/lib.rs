//! # Orderer
//!
//! A single-node ordering service for permissioned chains.
//!
//! ## Overview
//!
//! The orderer accepts transaction envelopes over Broadcast, orders them into
//! blocks, and streams committed blocks to readers over Deliver:
//!
//! - **Broadcast**: one [`BroadcastResponse`] per envelope, in order
//! - **Solo ordering**: a per-chain task cuts blocks by count or timeout;
//!   configuration transactions are validated when ordered and committed in
//!   a block of their own
//! - **Deliver**: seek and acknowledgement-windowed streaming, see
//!   [`deliver`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use orderer::{Orderer, OrdererConfig};
//! use orderer_testkit::ChainFixture;
//!
//! async fn example() -> orderer::Result<()> {
//!     let orderer = Orderer::new(OrdererConfig::default());
//!     let chain = ChainFixture::new("payments");
//!
//!     let chain_id = orderer.bootstrap_chain(chain.genesis_block()).await?;
//!     let status = orderer.broadcast_handler().submit(chain.message(b"tx")).await;
//!     assert!(status.is_success());
//!
//!     orderer.shutdown().await;
//!     # let _ = chain_id;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `orderer::core` - Blocks, envelopes, configuration items, status codes
//! - `orderer::policy` - Signature policies
//! - `orderer::configtx` - Configuration validation and per-chain state
//! - `orderer::ledger` - Block ledgers (memory and SQLite)
//! - `orderer::deliver` - Deliver sessions and the stream transport

pub mod backend;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod orderer;
pub mod registry;
pub mod solo;

// Re-export component crates
pub use orderer_configtx as configtx;
pub use orderer_core as core;
pub use orderer_deliver as deliver;
pub use orderer_ledger as ledger;
pub use orderer_policy as policy;

// Re-export main types for convenience
pub use backend::OrderingBackend;
pub use broadcast::{BroadcastHandler, BroadcastResponse};
pub use config::{BatchConfig, BroadcastConfig, LedgerConfig, OrdererConfig};
pub use error::{OrdererError, Result, SubmitError};
pub use orderer::Orderer;
pub use registry::{ChainContext, ChainRegistry};
pub use solo::SoloBackend;

// Re-export commonly used core types
pub use orderer_core::{Block, ChainId, Envelope, Status};
