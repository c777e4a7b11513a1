//! Named policy lookup built from a chain's Policy-typed items.

use std::collections::HashMap;

use orderer_core::{ConfigurationItem, ItemType};

use crate::compile::CompiledPolicy;
use crate::config::PolicyConfig;
use crate::error::{PolicyError, Result};

/// Compiled policies keyed by item name.
#[derive(Debug, Clone, Default)]
pub struct PolicyManager {
    policies: HashMap<String, CompiledPolicy>,
}

impl PolicyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every Policy-typed item in `items`. Items of other types are
    /// skipped. The first invalid policy aborts the load.
    pub fn from_items<'a>(
        items: impl IntoIterator<Item = &'a ConfigurationItem>,
        config: &PolicyConfig,
    ) -> Result<Self> {
        let mut manager = Self::new();
        for item in items {
            if item.item_type != ItemType::Policy {
                continue;
            }
            let policy = CompiledPolicy::from_bytes(&item.value, config).map_err(|e| {
                PolicyError::InvalidItem {
                    name: item.key.clone(),
                    source: Box::new(e),
                }
            })?;
            manager.insert(item.key.clone(), policy);
        }
        Ok(manager)
    }

    pub fn insert(&mut self, name: impl Into<String>, policy: CompiledPolicy) {
        self.policies.insert(name.into(), policy);
    }

    pub fn get(&self, name: &str) -> Option<&CompiledPolicy> {
        self.policies.get(name)
    }

    /// Policy names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.policies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{SignaturePolicy, SignaturePolicyEnvelope};
    use orderer_core::{ChainId, Keypair};

    fn policy_item(name: &str, envelope: &SignaturePolicyEnvelope) -> ConfigurationItem {
        ConfigurationItem::new(ChainId::from("chain"), ItemType::Policy, name)
            .with_value(envelope.to_bytes().unwrap())
    }

    #[test]
    fn test_loads_only_policy_items() {
        let admin = Keypair::from_seed(&[1; 32]);
        let items = vec![
            policy_item(
                "Admins",
                &SignaturePolicyEnvelope::new(
                    SignaturePolicy::signed_by(0),
                    vec![admin.identity()],
                ),
            ),
            policy_item(
                "AcceptAll",
                &SignaturePolicyEnvelope::new(SignaturePolicy::accept_all(), vec![]),
            ),
            ConfigurationItem::new(ChainId::from("chain"), ItemType::Orderer, "BatchSize")
                .with_value(b"10".to_vec()),
        ];

        let manager = PolicyManager::from_items(&items, &PolicyConfig::default()).unwrap();
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.names(), vec!["AcceptAll", "Admins"]);
        assert_eq!(manager.get("Admins").unwrap().identities(), &[admin.identity()]);
        assert!(manager.get("BatchSize").is_none());
    }

    #[test]
    fn test_invalid_policy_names_item() {
        let items = vec![policy_item(
            "Broken",
            &SignaturePolicyEnvelope::new(SignaturePolicy::signed_by(3), vec![]),
        )];

        let err = PolicyManager::from_items(&items, &PolicyConfig::default()).unwrap_err();
        match err {
            PolicyError::InvalidItem { name, source } => {
                assert_eq!(name, "Broken");
                assert!(matches!(*source, PolicyError::IndexOutOfRange { index: 3, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_undecodable_policy_value() {
        let items = vec![ConfigurationItem::new(ChainId::from("chain"), ItemType::Policy, "Junk")
            .with_value(vec![0xff, 0x00])];
        assert!(matches!(
            PolicyManager::from_items(&items, &PolicyConfig::default()),
            Err(PolicyError::InvalidItem { .. })
        ));
    }
}
