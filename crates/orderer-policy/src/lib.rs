//! # Orderer Policy
//!
//! Signature-threshold policies that gate configuration changes.
//!
//! ## Overview
//!
//! A policy is a recursive formula over an ordered identity list:
//!
//! - `SignedBy(i)` is satisfied when a valid signature from `identities[i]`
//!   is presented
//! - `NOutOf(n, children)` is satisfied when at least `n` children are
//!
//! ## Two Phases
//!
//! 1. **Compile**: [`CompiledPolicy::compile`] checks index bounds, threshold
//!    bounds, version and depth once, when the policy is loaded
//! 2. **Evaluate**: [`CompiledPolicy::evaluate`] walks the already-validated
//!    tree against a set of signatures; it cannot fail structurally
//!
//! Both phases walk the tree with an explicit stack, so a hostile tree cannot
//! exhaust the call stack.
//!
//! ## Usage
//!
//! ```rust
//! use orderer_policy::{CompiledPolicy, PolicyConfig, SignaturePolicy, SignaturePolicyEnvelope};
//! use orderer_core::{Ed25519Verifier, Keypair};
//!
//! let alice = Keypair::from_seed(&[1; 32]);
//! let bob = Keypair::from_seed(&[2; 32]);
//!
//! // Either alice or bob may sign
//! let envelope = SignaturePolicyEnvelope::new(
//!     SignaturePolicy::or(vec![SignaturePolicy::signed_by(0), SignaturePolicy::signed_by(1)]),
//!     vec![alice.identity(), bob.identity()],
//! );
//! let policy = CompiledPolicy::compile(envelope, &PolicyConfig::default()).unwrap();
//! assert!(!policy.evaluate(b"msg", &[], &Ed25519Verifier));
//! ```

pub mod compile;
pub mod config;
pub mod error;
pub mod manager;
pub mod policy;

pub use compile::{validate_policy, CompiledPolicy};
pub use config::{PolicyConfig, DEFAULT_MAX_DEPTH};
pub use error::{PolicyError, Result};
pub use manager::PolicyManager;
pub use policy::{SignaturePolicy, SignaturePolicyEnvelope, POLICY_VERSION};
