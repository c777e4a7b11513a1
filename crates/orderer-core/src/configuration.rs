//! Chain configuration data model.
//!
//! A chain's configuration is a set of items keyed by `(type, key)`. Every
//! change is shipped as a complete [`ConfigurationEnvelope`] snapshot with a
//! sequence number one higher than the last accepted one.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::item_signed_message;
use crate::crypto::Keypair;
use crate::error::CoreError;
use crate::types::{ChainId, Identity};

/// Kind of a configuration item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum ItemType {
    /// Chain-wide parameters.
    Chain = 0,
    /// Ordering service parameters (batch size, backend type).
    Orderer = 1,
    /// Peer parameters.
    Peer = 2,
    /// Membership service (identity provider) parameters.
    MembershipService = 3,
    /// A named signature policy. The key is the policy name and the value a
    /// CBOR-encoded signature policy envelope.
    Policy = 4,
}

impl ItemType {
    /// Convert to the wire discriminant.
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Parse a wire discriminant.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(ItemType::Chain),
            1 => Some(ItemType::Orderer),
            2 => Some(ItemType::Peer),
            3 => Some(ItemType::MembershipService),
            4 => Some(ItemType::Policy),
            _ => None,
        }
    }
}

/// The identity of an item within its chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub item_type: ItemType,
    pub key: String,
}

impl ItemKey {
    pub fn new(item_type: ItemType, key: impl Into<String>) -> Self {
        Self {
            item_type,
            key: key.into(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{}", self.item_type, self.key)
    }
}

/// Header binding an item to exactly one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHeader {
    pub chain_id: ChainId,
}

/// A single configuration item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationItem {
    /// The chain this item belongs to.
    pub header: ChainHeader,
    /// Item kind.
    pub item_type: ItemType,
    /// Key, unique within the item kind.
    pub key: String,
    /// Configuration sequence at which this item last changed.
    pub last_modified: u64,
    /// Name of the policy that must be satisfied to change this item.
    pub modification_policy: String,
    /// Opaque value; only Policy-typed values are interpreted.
    pub value: Bytes,
}

impl ConfigurationItem {
    /// Create an item with an empty value, no modification policy and
    /// `last_modified = 0`.
    pub fn new(chain_id: ChainId, item_type: ItemType, key: impl Into<String>) -> Self {
        Self {
            header: ChainHeader { chain_id },
            item_type,
            key: key.into(),
            last_modified: 0,
            modification_policy: String::new(),
            value: Bytes::new(),
        }
    }

    /// Set the value.
    pub fn with_value(mut self, value: impl Into<Bytes>) -> Self {
        self.value = value.into();
        self
    }

    /// Set the modification policy name.
    pub fn with_modification_policy(mut self, policy: impl Into<String>) -> Self {
        self.modification_policy = policy.into();
        self
    }

    /// Set the last-modified sequence.
    pub fn with_last_modified(mut self, sequence: u64) -> Self {
        self.last_modified = sequence;
        self
    }

    /// This item's key.
    pub fn item_key(&self) -> ItemKey {
        ItemKey::new(self.item_type, self.key.clone())
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.header.chain_id
    }

    /// The exact bytes a signer must sign to authorize this item.
    pub fn signed_message(&self) -> Vec<u8> {
        item_signed_message(self)
    }
}

/// One signature over a configuration item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSignature {
    /// Claimed signer.
    pub signer: Identity,
    /// Signature over [`ConfigurationItem::signed_message`].
    pub signature: Bytes,
}

/// A configuration item together with the signatures authorizing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedConfigurationItem {
    pub item: ConfigurationItem,
    pub signatures: Vec<ConfigSignature>,
}

impl SignedConfigurationItem {
    /// Wrap an item with no signatures.
    pub fn unsigned(item: ConfigurationItem) -> Self {
        Self {
            item,
            signatures: Vec::new(),
        }
    }

    /// Append a signature by `keypair` over the item.
    pub fn sign(mut self, keypair: &Keypair) -> Self {
        let signature = keypair.sign(&self.item.signed_message());
        self.signatures.push(ConfigSignature {
            signer: keypair.identity(),
            signature: Bytes::copy_from_slice(signature.as_bytes()),
        });
        self
    }
}

/// A complete configuration snapshot for a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationEnvelope {
    /// Sequence number of this snapshot.
    pub sequence: u64,
    /// Every live item of the chain.
    pub items: Vec<SignedConfigurationItem>,
}

impl ConfigurationEnvelope {
    pub fn new(sequence: u64, items: Vec<SignedConfigurationItem>) -> Self {
        Self { sequence, items }
    }

    /// Encode as CBOR (the payload of a configuration transaction).
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from CBOR.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}
