//! Strong type definitions for the ordering service.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Ed25519PublicKey;

/// Identifier of a chain: an independently ordered log with its own
/// configuration and sequence numbering.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainId(String);

impl ChainId {
    /// Create a chain id from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty chain id never names a real chain.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({})", self.0)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ChainId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An opaque credential reference.
///
/// Policies address identities by position in an ordered list; the policy
/// evaluator only ever compares identities for equality and hands them to a
/// [`SignatureVerifier`](crate::crypto::SignatureVerifier).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(Bytes);

impl Identity {
    /// Wrap raw credential bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Identity({})", &hex[..hex.len().min(16)])
    }
}

impl From<Ed25519PublicKey> for Identity {
    fn from(key: Ed25519PublicKey) -> Self {
        Self(Bytes::copy_from_slice(key.as_bytes()))
    }
}

impl AsRef<[u8]> for Identity {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_display() {
        let id = ChainId::new("system-chain");
        assert_eq!(id.to_string(), "system-chain");
        assert_eq!(format!("{:?}", id), "ChainId(system-chain)");
        assert!(!id.is_empty());
        assert!(ChainId::from("").is_empty());
    }

    #[test]
    fn test_identity_debug_short_bytes() {
        let id = Identity::from_bytes(vec![0xab, 0xcd]);
        assert_eq!(format!("{:?}", id), "Identity(abcd)");
    }

    #[test]
    fn test_identity_from_public_key() {
        let key = Ed25519PublicKey::from_bytes([0x11; 32]);
        let id = Identity::from(key);
        assert_eq!(id.as_bytes(), &[0x11; 32]);
    }
}
