//! Policy tree and envelope types.

use serde::{Deserialize, Serialize};

use orderer_core::Identity;

use crate::error::{PolicyError, Result};

/// Current signature policy envelope version.
pub const POLICY_VERSION: u32 = 0;

/// A signature-threshold formula. Children are owned; the tree has no
/// sharing and no cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignaturePolicy {
    /// Satisfied by a valid signature from `identities[index]`.
    SignedBy(u32),
    /// Satisfied when at least `n` of `policies` are satisfied.
    NOutOf {
        n: u32,
        policies: Vec<SignaturePolicy>,
    },
}

impl SignaturePolicy {
    pub fn signed_by(index: u32) -> Self {
        SignaturePolicy::SignedBy(index)
    }

    pub fn n_out_of(n: u32, policies: Vec<SignaturePolicy>) -> Self {
        SignaturePolicy::NOutOf { n, policies }
    }

    /// All of `policies`.
    pub fn and(policies: Vec<SignaturePolicy>) -> Self {
        let n = policies.len() as u32;
        SignaturePolicy::NOutOf { n, policies }
    }

    /// Any one of `policies`.
    pub fn or(policies: Vec<SignaturePolicy>) -> Self {
        SignaturePolicy::NOutOf { n: 1, policies }
    }

    /// The policy that is satisfied by anything, including no signatures.
    pub fn accept_all() -> Self {
        SignaturePolicy::NOutOf {
            n: 0,
            policies: Vec::new(),
        }
    }
}

/// A policy together with the identity list its leaves index into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePolicyEnvelope {
    pub version: u32,
    pub policy: SignaturePolicy,
    pub identities: Vec<Identity>,
}

impl SignaturePolicyEnvelope {
    /// Wrap a policy at the current version.
    pub fn new(policy: SignaturePolicy, identities: Vec<Identity>) -> Self {
        Self {
            version: POLICY_VERSION,
            policy,
            identities,
        }
    }

    /// Encode as CBOR (the value of a Policy-typed configuration item).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| PolicyError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from CBOR. The decoder's own recursion limit bounds nesting.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| PolicyError::Decode(e.to_string()))
    }
}
