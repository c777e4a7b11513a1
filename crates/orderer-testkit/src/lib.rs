//! # Orderer Testkit
//!
//! Testing utilities for the ordering service.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a [`ChainFixture`] that owns a chain's admin keys and its
//!   current configuration, and builds genesis blocks and signed updates
//! - **Generators**: proptest strategies for structurally valid policies and
//!   signer sets, with a reference evaluator to check against
//!
//! ## Test Fixtures
//!
//! ```rust
//! use orderer_testkit::ChainFixture;
//!
//! let mut chain = ChainFixture::new("demo");
//! let genesis = chain.genesis_block();
//! assert_eq!(genesis.number(), 0);
//!
//! let update = chain.next_update_orderer("BatchSize", b"20");
//! assert_eq!(update.sequence, 2);
//! chain.advance(update);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use orderer_testkit::generators::policy_case;
//!
//! proptest! {
//!     #[test]
//!     fn compiled_matches_reference(case in policy_case()) {
//!         let policy = case.compile();
//!         let signatures = case.signatures(b"m", &case.signers);
//!         prop_assert_eq!(
//!             policy.evaluate(b"m", &signatures, &orderer_core::Ed25519Verifier),
//!             case.expected(&case.signers)
//!         );
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{ChainFixture, ADMINS_POLICY, BATCH_SIZE};
pub use generators::{policy, policy_case, PolicyCase};
