//! Proptest generators for policies and signer sets.
//!
//! Every generated policy is structurally valid: leaves index into the
//! identity list and each threshold is at most its child count.

use bytes::Bytes;
use proptest::prelude::*;

use orderer_core::{ConfigSignature, Keypair};
use orderer_policy::{CompiledPolicy, PolicyConfig, SignaturePolicy, SignaturePolicyEnvelope};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// A valid policy over `identities` slots, nested at most `levels` deep
/// below the root. `identities` must be non-zero.
pub fn policy(identities: u32, levels: u32) -> impl Strategy<Value = SignaturePolicy> {
    let leaf = (0..identities).prop_map(SignaturePolicy::signed_by);
    leaf.prop_recursive(levels, 32, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_flat_map(|children| {
            let count = children.len() as u32;
            (0..=count).prop_map(move |n| SignaturePolicy::n_out_of(n, children.clone()))
        })
    })
}

/// A policy, the keys its leaves refer to, and which of them sign.
#[derive(Debug, Clone)]
pub struct PolicyCase {
    pub keys: Vec<Keypair>,
    pub policy: SignaturePolicy,
    pub signers: Vec<bool>,
}

/// Between one and five identities, a policy over them and a signer set.
pub fn policy_case() -> impl Strategy<Value = PolicyCase> {
    (1u32..6)
        .prop_flat_map(|n| {
            (
                Just(n),
                policy(n, 4),
                prop::collection::vec(any::<bool>(), n as usize),
            )
        })
        .prop_map(|(n, policy, signers)| PolicyCase {
            keys: (0..n)
                .map(|i| Keypair::from_seed(&[i as u8 + 1; 32]))
                .collect(),
            policy,
            signers,
        })
}

impl PolicyCase {
    pub fn envelope(&self) -> SignaturePolicyEnvelope {
        SignaturePolicyEnvelope::new(
            self.policy.clone(),
            self.keys.iter().map(Keypair::identity).collect(),
        )
    }

    /// Compile with a depth limit generous enough for any generated tree.
    pub fn compile(&self) -> CompiledPolicy {
        CompiledPolicy::compile(self.envelope(), &PolicyConfig { max_depth: 64 })
            .unwrap_or_else(|e| panic!("generated policy failed to compile: {e}"))
    }

    /// Signatures over `message` from every key marked in `signers`.
    pub fn signatures(&self, message: &[u8], signers: &[bool]) -> Vec<ConfigSignature> {
        self.keys
            .iter()
            .zip(signers)
            .filter(|(_, signs)| **signs)
            .map(|(key, _)| ConfigSignature {
                signer: key.identity(),
                signature: Bytes::copy_from_slice(key.sign(message).as_bytes()),
            })
            .collect()
    }

    /// Reference evaluation by direct recursion over the tree.
    pub fn expected(&self, signers: &[bool]) -> bool {
        fn eval(policy: &SignaturePolicy, signers: &[bool]) -> bool {
            match policy {
                SignaturePolicy::SignedBy(index) => {
                    signers.get(*index as usize).copied().unwrap_or(false)
                }
                SignaturePolicy::NOutOf { n, policies } => {
                    policies.iter().filter(|child| eval(child, signers)).count() >= *n as usize
                }
            }
        }
        eval(&self.policy, signers)
    }
}
