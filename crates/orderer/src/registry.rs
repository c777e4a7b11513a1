//! Chains known to this orderer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use orderer_core::ChainId;
use orderer_deliver::LedgerProvider;
use orderer_ledger::BlockLedger;

use crate::backend::OrderingBackend;
use crate::error::{OrdererError, Result};

/// Everything needed to serve one chain.
#[derive(Clone)]
pub struct ChainContext {
    pub ledger: Arc<dyn BlockLedger>,
    pub backend: Arc<dyn OrderingBackend>,
}

/// Maps chain ids to their contexts.
///
/// The map lock is only held to look a chain up or add one; contexts are
/// handed out as clones and used without it.
#[derive(Default)]
pub struct ChainRegistry {
    chains: RwLock<HashMap<ChainId, ChainContext>>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chain. Fails if the id is taken.
    pub async fn insert(&self, chain_id: ChainId, context: ChainContext) -> Result<()> {
        let mut chains = self.chains.write().await;
        if chains.contains_key(&chain_id) {
            return Err(OrdererError::ChainExists(chain_id));
        }
        chains.insert(chain_id, context);
        Ok(())
    }

    pub async fn get(&self, chain_id: &ChainId) -> Option<ChainContext> {
        self.chains.read().await.get(chain_id).cloned()
    }

    pub async fn contains(&self, chain_id: &ChainId) -> bool {
        self.chains.read().await.contains_key(chain_id)
    }

    /// Registered chains in id order.
    pub async fn chains(&self) -> Vec<ChainId> {
        let mut ids: Vec<ChainId> = self.chains.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl LedgerProvider for ChainRegistry {
    async fn ledger(&self, chain_id: &ChainId) -> Option<Arc<dyn BlockLedger>> {
        self.get(chain_id).await.map(|context| context.ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderer_core::Envelope;
    use orderer_ledger::MemoryLedger;
    use orderer_testkit::ChainFixture;

    use crate::error::SubmitError;

    struct Discard;

    #[async_trait]
    impl OrderingBackend for Discard {
        async fn submit(&self, _envelope: Envelope) -> std::result::Result<(), SubmitError> {
            Ok(())
        }
    }

    fn context(chain: &ChainFixture) -> ChainContext {
        ChainContext {
            ledger: Arc::new(MemoryLedger::new(chain.genesis_block(), None)),
            backend: Arc::new(Discard),
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let registry = ChainRegistry::new();
        let b = ChainFixture::new("b");
        let a = ChainFixture::new("a");
        registry.insert(b.chain_id.clone(), context(&b)).await.unwrap();
        registry.insert(a.chain_id.clone(), context(&a)).await.unwrap();

        assert_eq!(registry.chains().await, vec![a.chain_id.clone(), b.chain_id.clone()]);
        assert!(registry.contains(&a.chain_id).await);
        assert!(registry.ledger(&ChainId::from("c")).await.is_none());

        let ledger = registry.ledger(&a.chain_id).await.unwrap();
        assert_eq!(ledger.height().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let registry = ChainRegistry::new();
        let chain = ChainFixture::new("dup");
        registry.insert(chain.chain_id.clone(), context(&chain)).await.unwrap();
        assert!(matches!(
            registry.insert(chain.chain_id.clone(), context(&chain)).await,
            Err(OrdererError::ChainExists(_))
        ));
    }
}
