//! Transaction envelopes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::canonical::envelope_signed_message;
use crate::configuration::ConfigurationEnvelope;
use crate::crypto::Keypair;
use crate::error::CoreError;
use crate::types::{ChainId, Identity};

/// Discriminator for how the envelope's data is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum EnvelopeKind {
    /// Opaque application payload.
    Message = 0,
    /// A CBOR-encoded [`ConfigurationEnvelope`].
    ConfigurationTransaction = 1,
}

impl EnvelopeKind {
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(EnvelopeKind::Message),
            1 => Some(EnvelopeKind::ConfigurationTransaction),
            _ => None,
        }
    }
}

/// Routing and authorship information of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    pub kind: EnvelopeKind,
    pub chain_id: ChainId,
    pub creator: Option<Identity>,
}

/// A signed container for a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub header: EnvelopeHeader,
    pub data: Bytes,
    /// Creator's signature over [`envelope_signed_message`]; empty if unsigned.
    pub signature: Bytes,
}

impl Envelope {
    /// An unsigned application message for `chain_id`.
    pub fn message(chain_id: ChainId, data: impl Into<Bytes>) -> Self {
        Self {
            header: EnvelopeHeader {
                kind: EnvelopeKind::Message,
                chain_id,
                creator: None,
            },
            data: data.into(),
            signature: Bytes::new(),
        }
    }

    /// An unsigned configuration transaction carrying `config`.
    pub fn configuration(chain_id: ChainId, config: &ConfigurationEnvelope) -> Result<Self, CoreError> {
        Ok(Self {
            header: EnvelopeHeader {
                kind: EnvelopeKind::ConfigurationTransaction,
                chain_id,
                creator: None,
            },
            data: Bytes::from(config.to_bytes()?),
            signature: Bytes::new(),
        })
    }

    /// Set the creator to `keypair` and sign header and data.
    pub fn signed_by(mut self, keypair: &Keypair) -> Self {
        self.header.creator = Some(keypair.identity());
        let signature = keypair.sign(&envelope_signed_message(&self));
        self.signature = Bytes::copy_from_slice(signature.as_bytes());
        self
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.header.chain_id
    }

    pub fn is_configuration(&self) -> bool {
        self.header.kind == EnvelopeKind::ConfigurationTransaction
    }

    /// Decode the configuration snapshot carried by a configuration transaction.
    pub fn configuration_envelope(&self) -> Result<ConfigurationEnvelope, CoreError> {
        if !self.is_configuration() {
            return Err(CoreError::DecodingError(
                "envelope is not a configuration transaction".into(),
            ));
        }
        ConfigurationEnvelope::from_bytes(&self.data)
    }
}
