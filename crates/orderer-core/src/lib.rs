//! # Orderer Core
//!
//! Pure primitives for the ordering service: blocks, envelopes, the chain
//! configuration data model, status codes and canonicalization.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over the data structures every other orderer crate exchanges.
//!
//! ## Key Types
//!
//! - [`Block`] - A numbered, hash-linked batch of envelopes
//! - [`Envelope`] - A signed container for a transaction or configuration change
//! - [`ConfigurationEnvelope`] - A complete, sequenced snapshot of a chain's configuration
//! - [`ChainId`] / [`Identity`] - Strong identifiers
//! - [`Status`] - The closed, HTTP-analogous status enum used on the wire
//!
//! ## Canonicalization
//!
//! Everything that is signed or hashed is encoded using deterministic CBOR.
//! See [`canonical`] module.

pub mod block;
pub mod canonical;
pub mod configuration;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod status;
pub mod types;
pub mod validation;

pub use block::{Block, BlockHeader};
pub use canonical::{
    block_data_hash, canonical_block_header_bytes, canonical_envelope_bytes,
    canonical_item_bytes, envelope_signed_message, item_signed_message,
};
pub use configuration::{
    ChainHeader, ConfigSignature, ConfigurationEnvelope, ConfigurationItem, ItemKey, ItemType,
    SignedConfigurationItem,
};
pub use crypto::{
    Blake3Hash, Ed25519PublicKey, Ed25519Signature, Ed25519Verifier, Keypair, SignatureVerifier,
};
pub use envelope::{Envelope, EnvelopeHeader, EnvelopeKind};
pub use error::{CoreError, ValidationError};
pub use status::Status;
pub use types::{ChainId, Identity};
pub use validation::{validate_envelope, verify_envelope_signature, MAX_MESSAGE_BYTES};
