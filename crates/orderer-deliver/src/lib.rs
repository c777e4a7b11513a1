//! # Orderer Deliver
//!
//! Streams a chain's blocks to a reader under an acknowledgement window.
//!
//! ## Overview
//!
//! A client opens a Deliver stream and sends a [`SeekInfo`]. The server
//! positions a ledger cursor, then streams blocks as they become available
//! while fewer than `window_size` blocks are unacknowledged. An
//! [`DeliverUpdate::Acknowledgement`] moves the window; a new seek discards
//! it and starts over.
//!
//! ## Session States
//!
//! ```text
//! AwaitSeek --seek--> Locating --cursor--> Streaming <--ack/window--> Blocked
//!     \                   \                    \                        /
//!      +-------------------+--------------------+------> Closed <------+
//! ```
//!
//! [`DeliverSession`] is the pure state machine. [`DeliverHandler`] drives it
//! with two tasks per stream: a reader forwarding client updates into a
//! channel, and a producer that owns the session and the ledger cursor and
//! always looks at pending updates before sending the next block.
//!
//! ## Errors
//!
//! Every failure ends the stream with one [`DeliverResponse::Error`]
//! carrying a [`Status`](orderer_core::Status).

pub mod authorizer;
pub mod config;
pub mod error;
pub mod messages;
pub mod server;
pub mod session;
pub mod transport;

pub use authorizer::{AllowAll, DeliverAuthorizer, ReaderAllowlist};
pub use config::{DeliverConfig, StaleAck};
pub use error::{DeliverError, Result};
pub use messages::{DeliverResponse, DeliverUpdate, SeekInfo, SeekStart};
pub use server::{DeliverHandler, LedgerProvider};
pub use session::{DeliverSession, SessionState, Step};
pub use transport::{Inbound, Outbound, TransportError};
