//! Per-chain serialization of configuration proposals.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use orderer_core::{
    ChainId, ConfigurationEnvelope, ConfigurationItem, Ed25519Verifier, Envelope,
    SignatureVerifier,
};
use orderer_policy::{PolicyConfig, PolicyManager};

use crate::error::{ConfigError, Result};
use crate::state::{validate, ChainConfig};

/// A validated configuration waiting to be installed.
#[derive(Debug, Clone)]
pub struct StagedConfiguration {
    staged_from: u64,
    next: ChainConfig,
}

impl StagedConfiguration {
    pub fn chain_id(&self) -> &ChainId {
        self.next.chain_id()
    }

    pub fn sequence(&self) -> u64 {
        self.next.sequence()
    }

    /// The configuration that installing would make current.
    pub fn config(&self) -> &ChainConfig {
        &self.next
    }
}

/// Owns the accepted configuration of every chain.
///
/// Each chain has its own lock. The chain map is locked only to find or
/// insert a chain, so proposals for different chains never wait on each
/// other.
pub struct ConfigurationManager {
    chains: RwLock<HashMap<ChainId, Arc<Mutex<ChainConfig>>>>,
    policy_config: PolicyConfig,
    verifier: Arc<dyn SignatureVerifier>,
}

impl ConfigurationManager {
    /// A manager that verifies Ed25519 signatures.
    pub fn new(policy_config: PolicyConfig) -> Self {
        Self::with_verifier(policy_config, Arc::new(Ed25519Verifier))
    }

    pub fn with_verifier(policy_config: PolicyConfig, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            chains: RwLock::new(HashMap::new()),
            policy_config,
            verifier,
        }
    }

    async fn chain(&self, chain_id: &ChainId) -> Option<Arc<Mutex<ChainConfig>>> {
        self.chains.read().await.get(chain_id).cloned()
    }

    /// Validate `envelope` against the chain's current state and apply it.
    ///
    /// Returns the new sequence. On rejection the chain is unchanged. The
    /// first accepted envelope of an unknown chain creates it.
    pub async fn propose(&self, chain_id: &ChainId, envelope: &ConfigurationEnvelope) -> Result<u64> {
        let result = self.propose_inner(chain_id, envelope).await;
        if let Err(e) = &result {
            warn!(
                chain = %chain_id,
                sequence = envelope.sequence,
                error = %e,
                "configuration rejected"
            );
        }
        result
    }

    async fn propose_inner(&self, chain_id: &ChainId, envelope: &ConfigurationEnvelope) -> Result<u64> {
        loop {
            let staged = self.stage(chain_id, envelope).await?;
            match self.install(staged).await {
                Err(ConfigError::Superseded { .. }) => {
                    // Another proposal won; judge this envelope against its state
                    debug!(chain = %chain_id, "concurrent proposal, retrying");
                }
                result => return result,
            }
        }
    }

    /// Validate `envelope` without applying it.
    ///
    /// The result remembers the sequence it was validated against;
    /// [`install`](Self::install) refuses it if the chain has moved since.
    pub async fn stage(
        &self,
        chain_id: &ChainId,
        envelope: &ConfigurationEnvelope,
    ) -> Result<StagedConfiguration> {
        let current = match self.chain(chain_id).await {
            Some(chain) => chain.lock().await.clone(),
            None => ChainConfig::empty(chain_id.clone()),
        };
        let next = validate(
            chain_id,
            envelope,
            &current,
            &self.policy_config,
            self.verifier.as_ref(),
        )?;
        Ok(StagedConfiguration {
            staged_from: current.sequence(),
            next,
        })
    }

    /// Stage an ordered configuration transaction.
    pub async fn stage_ordered(&self, envelope: &Envelope) -> Result<StagedConfiguration> {
        let config = envelope.configuration_envelope()?;
        self.stage(envelope.chain_id(), &config).await
    }

    /// Make a staged configuration current.
    ///
    /// Fails with [`ConfigError::Superseded`], leaving the chain unchanged, if
    /// another configuration was installed after `staged` was validated.
    pub async fn install(&self, staged: StagedConfiguration) -> Result<u64> {
        let StagedConfiguration { staged_from, next } = staged;
        let chain_id = next.chain_id().clone();
        let sequence = next.sequence();

        if let Some(chain) = self.chain(&chain_id).await {
            let mut current = chain.lock().await;
            if current.sequence() != staged_from {
                return Err(ConfigError::Superseded {
                    staged_from,
                    current: current.sequence(),
                });
            }
            *current = next;
        } else {
            let mut chains = self.chains.write().await;
            if let Some(chain) = chains.get(&chain_id) {
                let current = chain.lock().await.sequence();
                return Err(ConfigError::Superseded {
                    staged_from,
                    current,
                });
            }
            if staged_from != 0 {
                return Err(ConfigError::UnknownChain(chain_id));
            }
            chains.insert(chain_id.clone(), Arc::new(Mutex::new(next)));
        }

        info!(chain = %chain_id, sequence, "configuration accepted");
        Ok(sequence)
    }

    /// Validate and apply an ordered configuration transaction in one step.
    pub async fn apply_ordered(&self, envelope: &Envelope) -> Result<u64> {
        let config = envelope.configuration_envelope()?;
        self.propose(envelope.chain_id(), &config).await
    }

    /// Install an already-committed snapshot without checking signatures.
    /// Used when reopening a persisted chain.
    pub async fn restore(&self, chain_id: &ChainId, envelope: &ConfigurationEnvelope) -> Result<u64> {
        let config = ChainConfig::from_committed(chain_id.clone(), envelope, &self.policy_config)?;
        let sequence = config.sequence();
        self.chains
            .write()
            .await
            .insert(chain_id.clone(), Arc::new(Mutex::new(config)));
        debug!(chain = %chain_id, sequence, "configuration restored");
        Ok(sequence)
    }

    /// Current items (in key order) and sequence of a chain.
    pub async fn current_configuration(
        &self,
        chain_id: &ChainId,
    ) -> Option<(Vec<ConfigurationItem>, u64)> {
        let chain = self.chain(chain_id).await?;
        let config = chain.lock().await;
        Some((config.items().cloned().collect(), config.sequence()))
    }

    /// Snapshot of a chain's full state.
    pub async fn snapshot(&self, chain_id: &ChainId) -> Result<ChainConfig> {
        let chain = self
            .chain(chain_id)
            .await
            .ok_or_else(|| ConfigError::UnknownChain(chain_id.clone()))?;
        let config = chain.lock().await;
        Ok(config.clone())
    }

    pub async fn sequence(&self, chain_id: &ChainId) -> Option<u64> {
        let chain = self.chain(chain_id).await?;
        let sequence = chain.lock().await.sequence();
        Some(sequence)
    }

    /// Compiled policies of a chain's current configuration.
    pub async fn policy_manager(&self, chain_id: &ChainId) -> Option<Arc<PolicyManager>> {
        let chain = self.chain(chain_id).await?;
        let policies = Arc::clone(chain.lock().await.policies());
        Some(policies)
    }

    /// Chains with an accepted configuration, sorted.
    pub async fn chains(&self) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = self.chains.read().await.keys().cloned().collect();
        chains.sort();
        chains
    }
}
