//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use orderer_core::{
    Block, ChainId, ConfigurationEnvelope, ConfigurationItem, Envelope, ItemKey, ItemType, Keypair,
    SignedConfigurationItem,
};
use orderer_policy::{SignaturePolicy, SignaturePolicyEnvelope};

/// Name of the policy guarding every fixture item.
pub const ADMINS_POLICY: &str = "Admins";

/// Key of the Orderer item seeded into every fixture genesis.
pub const BATCH_SIZE: &str = "BatchSize";

/// A chain with `n` admin keys and a `threshold`-of-`n` Admins policy.
///
/// The fixture tracks the configuration it believes is current; call
/// [`ChainFixture::advance`] once an update has been accepted.
pub struct ChainFixture {
    pub chain_id: ChainId,
    pub admins: Vec<Keypair>,
    pub threshold: u32,
    current: ConfigurationEnvelope,
}

impl ChainFixture {
    /// One admin, threshold 1.
    pub fn new(chain_id: &str) -> Self {
        Self::with_admins(chain_id, 1, 1)
    }

    /// Deterministic admin keys derived from their index.
    pub fn with_admins(chain_id: &str, admins: usize, threshold: u32) -> Self {
        let admins = (0..admins)
            .map(|i| Keypair::from_seed(&[0xa0u8.wrapping_add(i as u8); 32]))
            .collect();
        let mut fixture = Self {
            chain_id: ChainId::from(chain_id),
            admins,
            threshold,
            current: ConfigurationEnvelope::new(0, Vec::new()),
        };

        let policy = fixture.admins_policy_item(1);
        let batch = fixture.item(ItemType::Orderer, BATCH_SIZE, b"10", 1);
        fixture.current = ConfigurationEnvelope::new(1, vec![fixture.sign(policy), fixture.sign(batch)]);
        fixture
    }

    /// The Admins policy as an envelope.
    pub fn admins_policy(&self) -> SignaturePolicyEnvelope {
        let leaves = (0..self.admins.len() as u32)
            .map(SignaturePolicy::signed_by)
            .collect();
        SignaturePolicyEnvelope::new(
            SignaturePolicy::n_out_of(self.threshold, leaves),
            self.admins.iter().map(Keypair::identity).collect(),
        )
    }

    fn admins_policy_item(&self, last_modified: u64) -> ConfigurationItem {
        let value = self.admins_policy().to_bytes().unwrap_or_default();
        self.item(ItemType::Policy, ADMINS_POLICY, &value, last_modified)
    }

    /// An item of this chain guarded by the Admins policy.
    pub fn item(
        &self,
        item_type: ItemType,
        key: &str,
        value: &[u8],
        last_modified: u64,
    ) -> ConfigurationItem {
        ConfigurationItem::new(self.chain_id.clone(), item_type, key)
            .with_value(value.to_vec())
            .with_modification_policy(ADMINS_POLICY)
            .with_last_modified(last_modified)
    }

    /// Sign with the first `threshold` admins.
    pub fn sign(&self, item: ConfigurationItem) -> SignedConfigurationItem {
        self.admins
            .iter()
            .take(self.threshold as usize)
            .fold(SignedConfigurationItem::unsigned(item), |signed, admin| {
                signed.sign(admin)
            })
    }

    /// The configuration the fixture considers current.
    pub fn current(&self) -> &ConfigurationEnvelope {
        &self.current
    }

    pub fn sequence(&self) -> u64 {
        self.current.sequence
    }

    /// The bootstrap configuration transaction.
    pub fn genesis_tx(&self) -> Envelope {
        let genesis = ConfigurationEnvelope::new(
            1,
            vec![
                self.sign(self.admins_policy_item(1)),
                self.sign(self.item(ItemType::Orderer, BATCH_SIZE, b"10", 1)),
            ],
        );
        self.config_tx(&genesis)
    }

    /// Block 0 of the chain.
    pub fn genesis_block(&self) -> Block {
        Block::genesis(self.genesis_tx())
    }

    /// Wrap a configuration envelope in a transaction for this chain.
    pub fn config_tx(&self, config: &ConfigurationEnvelope) -> Envelope {
        Envelope::configuration(self.chain_id.clone(), config)
            .unwrap_or_else(|e| panic!("fixture configuration does not encode: {e}"))
    }

    /// The successor of the current configuration with one item set to
    /// `value` (added if absent) and signed by the admins.
    pub fn next_update(&self, item_type: ItemType, key: &str, value: &[u8]) -> ConfigurationEnvelope {
        let sequence = self.current.sequence + 1;
        let target = ItemKey::new(item_type, key);
        let changed = self.sign(self.item(item_type, key, value, sequence));

        let mut items: Vec<SignedConfigurationItem> = self
            .current
            .items
            .iter()
            .filter(|signed| signed.item.item_key() != target)
            .cloned()
            .collect();
        items.push(changed);
        ConfigurationEnvelope::new(sequence, items)
    }

    /// Shorthand for an Orderer-typed update.
    pub fn next_update_orderer(&self, key: &str, value: &[u8]) -> ConfigurationEnvelope {
        self.next_update(ItemType::Orderer, key, value)
    }

    /// Record that `config` was accepted.
    pub fn advance(&mut self, config: ConfigurationEnvelope) {
        self.current = config;
    }

    /// An application message for this chain.
    pub fn message(&self, payload: &[u8]) -> Envelope {
        Envelope::message(self.chain_id.clone(), payload.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_matches_current() {
        let chain = ChainFixture::with_admins("fx", 3, 2);
        let genesis = chain.genesis_tx().configuration_envelope().unwrap();
        assert_eq!(&genesis, chain.current());
        assert_eq!(genesis.items.len(), 2);
        assert!(genesis.items.iter().all(|signed| signed.signatures.len() == 2));
    }

    #[test]
    fn test_next_update_replaces_one_item() {
        let chain = ChainFixture::new("fx");
        let update = chain.next_update_orderer(BATCH_SIZE, b"20");
        assert_eq!(update.sequence, 2);
        assert_eq!(update.items.len(), 2);

        let batch = update
            .items
            .iter()
            .find(|signed| signed.item.key == BATCH_SIZE)
            .unwrap();
        assert_eq!(batch.item.last_modified, 2);
        assert_eq!(batch.item.value.as_ref(), b"20");
    }
}
