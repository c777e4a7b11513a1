//! Chain configuration state and the validation that produces it.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use orderer_core::{
    canonical_item_bytes, ChainId, ConfigurationEnvelope, ConfigurationItem, ItemKey,
    SignatureVerifier, SignedConfigurationItem,
};
use orderer_policy::{PolicyConfig, PolicyManager};

use crate::error::{ConfigError, Result};

/// The accepted configuration of one chain.
///
/// Only produced by [`validate`] or [`ChainConfig::from_committed`], so it
/// always satisfies the structural rules of the last accepted envelope.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    chain_id: ChainId,
    sequence: u64,
    items: BTreeMap<ItemKey, ConfigurationItem>,
    policies: Arc<PolicyManager>,
}

impl ChainConfig {
    /// The state before the first envelope: no items, sequence 0.
    pub fn empty(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            sequence: 0,
            items: BTreeMap::new(),
            policies: Arc::new(PolicyManager::new()),
        }
    }

    /// Rebuild state from an envelope that was already accepted and
    /// committed. Structure and policies are checked; signatures are not.
    pub fn from_committed(
        chain_id: ChainId,
        envelope: &ConfigurationEnvelope,
        policy_config: &PolicyConfig,
    ) -> Result<Self> {
        let items = index_items(&chain_id, &envelope.items)?;
        let policies = PolicyManager::from_items(items.values(), policy_config)?;
        Ok(Self {
            chain_id,
            sequence: envelope.sequence,
            items,
            policies: Arc::new(policies),
        })
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn get(&self, key: &ItemKey) -> Option<&ConfigurationItem> {
        self.items.get(key)
    }

    /// Items in key order.
    pub fn items(&self) -> impl Iterator<Item = &ConfigurationItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Compiled Policy-typed items of this configuration.
    pub fn policies(&self) -> &Arc<PolicyManager> {
        &self.policies
    }
}

/// Index an envelope's items by key, checking chain headers and uniqueness.
fn index_items(
    chain_id: &ChainId,
    signed: &[SignedConfigurationItem],
) -> Result<BTreeMap<ItemKey, ConfigurationItem>> {
    let mut items = BTreeMap::new();
    for SignedConfigurationItem { item, .. } in signed {
        if item.chain_id() != chain_id {
            return Err(ConfigError::ChainMismatch {
                item: item.item_key(),
                expected: chain_id.clone(),
                found: item.chain_id().clone(),
            });
        }
        match items.entry(item.item_key()) {
            Entry::Occupied(entry) => return Err(ConfigError::DuplicateItem(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(item.clone());
            }
        }
    }
    Ok(items)
}

/// Decide whether `envelope` may replace `current` for `chain_id`.
///
/// Pure: `current` is never modified. On success the returned state is the
/// complete replacement.
pub fn validate(
    chain_id: &ChainId,
    envelope: &ConfigurationEnvelope,
    current: &ChainConfig,
    policy_config: &PolicyConfig,
    verifier: &dyn SignatureVerifier,
) -> Result<ChainConfig> {
    let items = index_items(chain_id, &envelope.items)?;

    let expected = current
        .sequence
        .checked_add(1)
        .ok_or(ConfigError::SequenceExhausted(current.sequence))?;
    if envelope.sequence != expected {
        return Err(ConfigError::BadSequence {
            expected,
            found: envelope.sequence,
        });
    }

    if let Some(missing) = current.items.keys().find(|key| !items.contains_key(*key)) {
        return Err(ConfigError::MissingItem(missing.clone()));
    }

    let is_changed = |key: &ItemKey, item: &ConfigurationItem| match current.items.get(key) {
        Some(stored) => stored.last_modified != item.last_modified,
        None => true,
    };

    if !items.iter().any(|(key, item)| is_changed(key, item)) {
        return Err(ConfigError::NoChange);
    }

    for (key, item) in &items {
        if is_changed(key, item) {
            if item.last_modified != envelope.sequence {
                return Err(ConfigError::BadLastModified {
                    item: key.clone(),
                    last_modified: item.last_modified,
                    sequence: envelope.sequence,
                });
            }
        } else if let Some(stored) = current.items.get(key) {
            if canonical_item_bytes(stored) != canonical_item_bytes(item) {
                return Err(ConfigError::ItemMutated(key.clone()));
            }
        }
    }

    let policies = PolicyManager::from_items(items.values(), policy_config)?;

    for signed in &envelope.items {
        let item = &signed.item;
        let key = item.item_key();
        if !is_changed(&key, item) {
            continue;
        }
        let policy = policies
            .get(&item.modification_policy)
            .ok_or_else(|| ConfigError::UnknownPolicy {
                item: key.clone(),
                policy: item.modification_policy.clone(),
            })?;
        if !policy.evaluate(&item.signed_message(), &signed.signatures, verifier) {
            return Err(ConfigError::PolicyNotSatisfied {
                item: key,
                policy: item.modification_policy.clone(),
            });
        }
    }

    Ok(ChainConfig {
        chain_id: chain_id.clone(),
        sequence: envelope.sequence,
        items,
        policies: Arc::new(policies),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderer_core::{Ed25519Verifier, ItemType, Keypair};
    use orderer_policy::{SignaturePolicy, SignaturePolicyEnvelope};
    use proptest::prelude::*;

    const CHAIN: &str = "testchain";
    const ADMINS: &str = "Admins";

    fn admin() -> Keypair {
        Keypair::from_seed(&[0x0a; 32])
    }

    fn chain() -> ChainId {
        ChainId::from(CHAIN)
    }

    fn admins_item(last_modified: u64) -> ConfigurationItem {
        let policy = SignaturePolicyEnvelope::new(
            SignaturePolicy::signed_by(0),
            vec![admin().identity()],
        );
        ConfigurationItem::new(chain(), ItemType::Policy, ADMINS)
            .with_value(policy.to_bytes().unwrap())
            .with_modification_policy(ADMINS)
            .with_last_modified(last_modified)
    }

    fn orderer_item(key: &str, value: &str, last_modified: u64) -> ConfigurationItem {
        ConfigurationItem::new(chain(), ItemType::Orderer, key)
            .with_value(value.as_bytes().to_vec())
            .with_modification_policy(ADMINS)
            .with_last_modified(last_modified)
    }

    fn signed(item: ConfigurationItem) -> SignedConfigurationItem {
        SignedConfigurationItem::unsigned(item).sign(&admin())
    }

    fn check(envelope: &ConfigurationEnvelope, current: &ChainConfig) -> Result<ChainConfig> {
        validate(&chain(), envelope, current, &PolicyConfig::default(), &Ed25519Verifier)
    }

    /// Sequence 5 with A last modified at 3 and B at 5.
    fn state_at_five() -> ChainConfig {
        let committed = ConfigurationEnvelope::new(
            5,
            vec![
                signed(admins_item(1)),
                signed(orderer_item("A", "a", 3)),
                signed(orderer_item("B", "b", 5)),
            ],
        );
        ChainConfig::from_committed(chain(), &committed, &PolicyConfig::default()).unwrap()
    }

    fn genesis() -> ConfigurationEnvelope {
        ConfigurationEnvelope::new(
            1,
            vec![signed(admins_item(1)), signed(orderer_item("BatchSize", "10", 1))],
        )
    }

    fn a_key() -> ItemKey {
        ItemKey::new(ItemType::Orderer, "A")
    }

    fn b_key() -> ItemKey {
        ItemKey::new(ItemType::Orderer, "B")
    }

    #[test]
    fn test_bootstrap_from_empty() {
        let state = check(&genesis(), &ChainConfig::empty(chain())).unwrap();
        assert_eq!(state.sequence(), 1);
        assert_eq!(state.len(), 2);
        assert!(state.policies().get(ADMINS).is_some());
    }

    #[test]
    fn test_bootstrap_must_be_sequence_one() {
        let mut env = genesis();
        env.sequence = 0;
        assert!(matches!(
            check(&env, &ChainConfig::empty(chain())),
            Err(ConfigError::BadSequence { expected: 1, found: 0 })
        ));
    }

    #[test]
    fn test_sequence_at_limit_cannot_advance() {
        let committed = ConfigurationEnvelope::new(u64::MAX, vec![signed(admins_item(1))]);
        let current =
            ChainConfig::from_committed(chain(), &committed, &PolicyConfig::default()).unwrap();
        let env = ConfigurationEnvelope::new(
            u64::MAX,
            vec![signed(admins_item(1)), signed(orderer_item("A", "a", u64::MAX))],
        );
        let err = check(&env, &current).unwrap_err();
        assert!(matches!(err, ConfigError::SequenceExhausted(u64::MAX)));
        assert_eq!(err.status(), orderer_core::Status::BadRequest);
    }

    #[test]
    fn test_update_one_item() {
        let current = state_at_five();
        let env = ConfigurationEnvelope::new(
            6,
            vec![
                signed(admins_item(1)),
                signed(orderer_item("A", "a", 3)),
                signed(orderer_item("B", "b2", 6)),
            ],
        );

        let next = check(&env, &current).unwrap();
        assert_eq!(next.sequence(), 6);
        assert_eq!(next.get(&a_key()).unwrap().last_modified, 3);
        assert_eq!(next.get(&b_key()).unwrap().last_modified, 6);
        assert_eq!(next.get(&b_key()).unwrap().value.as_ref(), b"b2");

        // The input state is untouched
        assert_eq!(current.sequence(), 5);
        assert_eq!(current.get(&b_key()).unwrap().last_modified, 5);
    }

    #[test]
    fn test_omitted_item_rejected() {
        let env = ConfigurationEnvelope::new(
            6,
            vec![signed(admins_item(1)), signed(orderer_item("B", "b2", 6))],
        );
        let err = check(&env, &state_at_five()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingItem(ref key) if *key == a_key()));
        assert_eq!(err.status(), orderer_core::Status::BadRequest);
    }

    #[test]
    fn test_skipped_sequence_rejected() {
        let env = ConfigurationEnvelope::new(
            7,
            vec![
                signed(admins_item(1)),
                signed(orderer_item("A", "a", 3)),
                signed(orderer_item("B", "b2", 7)),
            ],
        );
        assert!(matches!(
            check(&env, &state_at_five()),
            Err(ConfigError::BadSequence { expected: 6, found: 7 })
        ));
    }

    #[test]
    fn test_foreign_chain_item_rejected() {
        let foreign = ConfigurationItem::new(ChainId::from("other"), ItemType::Peer, "X")
            .with_modification_policy(ADMINS)
            .with_last_modified(1);
        let mut env = genesis();
        env.items.push(signed(foreign));
        assert!(matches!(
            check(&env, &ChainConfig::empty(chain())),
            Err(ConfigError::ChainMismatch { .. })
        ));
    }

    #[test]
    fn test_chain_check_precedes_sequence_check() {
        let foreign = ConfigurationItem::new(ChainId::from("other"), ItemType::Peer, "X");
        let env = ConfigurationEnvelope::new(9, vec![signed(foreign)]);
        assert!(matches!(
            check(&env, &ChainConfig::empty(chain())),
            Err(ConfigError::ChainMismatch { .. })
        ));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut env = genesis();
        env.items.push(signed(orderer_item("BatchSize", "20", 1)));
        assert!(matches!(
            check(&env, &ChainConfig::empty(chain())),
            Err(ConfigError::DuplicateItem(_))
        ));
    }

    #[test]
    fn test_no_change_rejected() {
        let env = ConfigurationEnvelope::new(
            6,
            vec![
                signed(admins_item(1)),
                signed(orderer_item("A", "a", 3)),
                signed(orderer_item("B", "b", 5)),
            ],
        );
        assert!(matches!(
            check(&env, &state_at_five()),
            Err(ConfigError::NoChange)
        ));
    }

    #[test]
    fn test_changed_item_must_carry_new_sequence() {
        let env = ConfigurationEnvelope::new(
            6,
            vec![
                signed(admins_item(1)),
                signed(orderer_item("A", "a", 3)),
                signed(orderer_item("B", "b2", 4)),
            ],
        );
        assert!(matches!(
            check(&env, &state_at_five()),
            Err(ConfigError::BadLastModified { last_modified: 4, sequence: 6, .. })
        ));
    }

    #[test]
    fn test_silent_mutation_rejected() {
        let env = ConfigurationEnvelope::new(
            6,
            vec![
                signed(admins_item(1)),
                signed(orderer_item("A", "tampered", 3)),
                signed(orderer_item("B", "b2", 6)),
            ],
        );
        assert!(matches!(
            check(&env, &state_at_five()),
            Err(ConfigError::ItemMutated(ref key)) if *key == a_key()
        ));
    }

    #[test]
    fn test_unsigned_change_forbidden() {
        let env = ConfigurationEnvelope::new(
            6,
            vec![
                signed(admins_item(1)),
                signed(orderer_item("A", "a", 3)),
                SignedConfigurationItem::unsigned(orderer_item("B", "b2", 6)),
            ],
        );
        let err = check(&env, &state_at_five()).unwrap_err();
        assert!(matches!(err, ConfigError::PolicyNotSatisfied { ref item, .. } if *item == b_key()));
        assert_eq!(err.status(), orderer_core::Status::Forbidden);
    }

    #[test]
    fn test_signature_by_outsider_forbidden() {
        let outsider = Keypair::from_seed(&[0x0b; 32]);
        let env = ConfigurationEnvelope::new(
            6,
            vec![
                signed(admins_item(1)),
                signed(orderer_item("A", "a", 3)),
                SignedConfigurationItem::unsigned(orderer_item("B", "b2", 6)).sign(&outsider),
            ],
        );
        assert!(matches!(
            check(&env, &state_at_five()),
            Err(ConfigError::PolicyNotSatisfied { .. })
        ));
    }

    #[test]
    fn test_unchanged_items_need_no_signatures() {
        let env = ConfigurationEnvelope::new(
            6,
            vec![
                SignedConfigurationItem::unsigned(admins_item(1)),
                SignedConfigurationItem::unsigned(orderer_item("A", "a", 3)),
                signed(orderer_item("B", "b2", 6)),
            ],
        );
        assert!(check(&env, &state_at_five()).is_ok());
    }

    #[test]
    fn test_unknown_modification_policy() {
        let item = orderer_item("C", "c", 6).with_modification_policy("Writers");
        let env = ConfigurationEnvelope::new(
            6,
            vec![
                signed(admins_item(1)),
                signed(orderer_item("A", "a", 3)),
                signed(orderer_item("B", "b", 5)),
                signed(item),
            ],
        );
        let err = check(&env, &state_at_five()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPolicy { ref policy, .. } if policy == "Writers"));
        assert_eq!(err.status(), orderer_core::Status::BadRequest);
    }

    #[test]
    fn test_invalid_policy_item_rejected() {
        let broken = SignaturePolicyEnvelope::new(SignaturePolicy::signed_by(4), vec![]);
        let item = ConfigurationItem::new(chain(), ItemType::Policy, "Broken")
            .with_value(broken.to_bytes().unwrap())
            .with_modification_policy(ADMINS)
            .with_last_modified(1);
        let mut env = genesis();
        env.items.push(signed(item));
        assert!(matches!(
            check(&env, &ChainConfig::empty(chain())),
            Err(ConfigError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_policy_change_is_judged_by_new_policy() {
        // Rotate the admin key: the new Admins item must be signed by the new key
        let rotated = Keypair::from_seed(&[0x0c; 32]);
        let policy =
            SignaturePolicyEnvelope::new(SignaturePolicy::signed_by(0), vec![rotated.identity()]);
        let new_admins = ConfigurationItem::new(chain(), ItemType::Policy, ADMINS)
            .with_value(policy.to_bytes().unwrap())
            .with_modification_policy(ADMINS)
            .with_last_modified(6);

        let items = |admins: SignedConfigurationItem| {
            ConfigurationEnvelope::new(
                6,
                vec![
                    admins,
                    signed(orderer_item("A", "a", 3)),
                    signed(orderer_item("B", "b", 5)),
                ],
            )
        };

        let by_old = items(signed(new_admins.clone()));
        assert!(matches!(
            check(&by_old, &state_at_five()),
            Err(ConfigError::PolicyNotSatisfied { .. })
        ));

        let by_new = items(SignedConfigurationItem::unsigned(new_admins).sign(&rotated));
        assert!(check(&by_new, &state_at_five()).is_ok());
    }

    proptest! {
        #[test]
        fn prop_only_successor_sequence_accepted(sequence in 0u64..20) {
            let env = ConfigurationEnvelope::new(
                sequence,
                vec![
                    signed(admins_item(1)),
                    signed(orderer_item("A", "a", 3)),
                    signed(orderer_item("B", "b2", sequence)),
                ],
            );
            let result = check(&env, &state_at_five());
            prop_assert_eq!(result.is_ok(), sequence == 6);
        }

        #[test]
        fn prop_accepted_keys_are_superset(extra in proptest::collection::btree_set("[a-z]{1,6}", 0..4)) {
            let mut items = vec![
                signed(admins_item(1)),
                signed(orderer_item("A", "a", 3)),
                signed(orderer_item("B", "b2", 6)),
            ];
            for key in &extra {
                items.push(signed(
                    ConfigurationItem::new(chain(), ItemType::Peer, key.clone())
                        .with_modification_policy(ADMINS)
                        .with_last_modified(6),
                ));
            }
            let current = state_at_five();
            let next = check(&ConfigurationEnvelope::new(6, items), &current).unwrap();
            for item in current.items() {
                prop_assert!(next.get(&item.item_key()).is_some());
            }
            prop_assert_eq!(next.len(), current.len() + extra.len());
        }
    }
}
