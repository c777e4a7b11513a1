//! Structural validation and evaluation of signature policies.

use orderer_core::{ConfigSignature, Identity, SignatureVerifier};

use crate::config::PolicyConfig;
use crate::error::{PolicyError, Result};
use crate::policy::{SignaturePolicy, SignaturePolicyEnvelope, POLICY_VERSION};

/// Validate a policy envelope's structure.
///
/// This performs:
/// - Version check
/// - `SignedBy` index bounds against the identity list
/// - `NOutOf` threshold bounds (`n <= children`)
/// - Depth bound
///
/// Returns the depth of the tree.
pub fn validate_policy(envelope: &SignaturePolicyEnvelope, max_depth: usize) -> Result<usize> {
    if envelope.version != POLICY_VERSION {
        return Err(PolicyError::UnsupportedVersion(envelope.version));
    }

    let identities = envelope.identities.len();
    let mut deepest = 0;
    let mut stack: Vec<(&SignaturePolicy, usize)> = vec![(&envelope.policy, 1)];

    while let Some((node, depth)) = stack.pop() {
        if depth > max_depth {
            return Err(PolicyError::TooDeep { max: max_depth });
        }
        deepest = deepest.max(depth);

        match node {
            SignaturePolicy::SignedBy(index) => {
                if *index as usize >= identities {
                    return Err(PolicyError::IndexOutOfRange {
                        index: *index,
                        identities,
                    });
                }
            }
            SignaturePolicy::NOutOf { n, policies } => {
                if *n as usize > policies.len() {
                    return Err(PolicyError::ThresholdOutOfRange {
                        n: *n,
                        children: policies.len(),
                    });
                }
                stack.extend(policies.iter().map(|child| (child, depth + 1)));
            }
        }
    }

    Ok(deepest)
}

/// A policy that passed [`validate_policy`]. Only compiled policies can be
/// evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPolicy {
    envelope: SignaturePolicyEnvelope,
    depth: usize,
}

/// Work item of the post-order evaluation.
enum Frame<'a> {
    Visit(&'a SignaturePolicy),
    Combine { n: u32, children: usize },
}

impl CompiledPolicy {
    /// Validate and wrap an envelope.
    pub fn compile(envelope: SignaturePolicyEnvelope, config: &PolicyConfig) -> Result<Self> {
        let depth = validate_policy(&envelope, config.max_depth)?;
        Ok(Self { envelope, depth })
    }

    /// Decode, validate and wrap the value of a Policy-typed item.
    pub fn from_bytes(bytes: &[u8], config: &PolicyConfig) -> Result<Self> {
        Self::compile(SignaturePolicyEnvelope::from_bytes(bytes)?, config)
    }

    pub fn envelope(&self) -> &SignaturePolicyEnvelope {
        &self.envelope
    }

    pub fn identities(&self) -> &[Identity] {
        &self.envelope.identities
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Evaluate against the signatures presented over `message`.
    ///
    /// Every node is evaluated; there is no short-circuit. Each identity slot
    /// is resolved once up front, so a signature is verified at most once per
    /// slot no matter how often the slot appears in the tree.
    pub fn evaluate(
        &self,
        message: &[u8],
        signatures: &[ConfigSignature],
        verifier: &dyn SignatureVerifier,
    ) -> bool {
        let signed: Vec<bool> = self
            .envelope
            .identities
            .iter()
            .map(|identity| {
                signatures.iter().any(|sig| {
                    &sig.signer == identity && verifier.verify(identity, message, &sig.signature)
                })
            })
            .collect();

        let mut work = vec![Frame::Visit(&self.envelope.policy)];
        let mut results: Vec<bool> = Vec::new();

        while let Some(frame) = work.pop() {
            match frame {
                Frame::Visit(SignaturePolicy::SignedBy(index)) => {
                    results.push(signed.get(*index as usize).copied().unwrap_or(false));
                }
                Frame::Visit(SignaturePolicy::NOutOf { n, policies }) => {
                    work.push(Frame::Combine {
                        n: *n,
                        children: policies.len(),
                    });
                    work.extend(policies.iter().rev().map(Frame::Visit));
                }
                Frame::Combine { n, children } => {
                    let start = results.len() - children;
                    let satisfied = results[start..].iter().filter(|ok| **ok).count();
                    results.truncate(start);
                    results.push(satisfied >= n as usize);
                }
            }
        }

        results.pop().unwrap_or(false)
    }
}
