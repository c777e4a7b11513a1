//! The orderer: chains, ingress and delivery behind one handle.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use orderer_configtx::{ConfigError, ConfigurationManager};
use orderer_core::{Blake3Hash, Block, ChainId, ConfigurationEnvelope, Ed25519Verifier, SignatureVerifier};
use orderer_deliver::{DeliverHandler, LedgerProvider};
use orderer_ledger::{BlockLedger, MemoryLedger, ReadOutcome, SqliteLedger};

use crate::broadcast::BroadcastHandler;
use crate::config::{LedgerConfig, OrdererConfig};
use crate::error::{OrdererError, Result};
use crate::registry::{ChainContext, ChainRegistry};
use crate::solo::SoloBackend;

/// Longest chain id accepted.
pub const MAX_CHAIN_ID_LEN: usize = 128;

/// A running ordering service.
///
/// Chains are added with [`Orderer::bootstrap_chain`]. Each chain gets its
/// own ledger and solo ordering task; chains share the configuration
/// manager, whose state is kept per chain.
pub struct Orderer {
    config: OrdererConfig,
    configuration: Arc<ConfigurationManager>,
    verifier: Arc<dyn SignatureVerifier>,
    registry: Arc<ChainRegistry>,
    backends: Mutex<Vec<Arc<SoloBackend>>>,
}

impl Orderer {
    pub fn new(config: OrdererConfig) -> Self {
        Self::with_verifier(config, Arc::new(Ed25519Verifier))
    }

    /// Use `verifier` for configuration and envelope signatures.
    pub fn with_verifier(config: OrdererConfig, verifier: Arc<dyn SignatureVerifier>) -> Self {
        let configuration = Arc::new(ConfigurationManager::with_verifier(
            config.policy.clone(),
            verifier.clone(),
        ));
        Self {
            config,
            configuration,
            verifier,
            registry: Arc::new(ChainRegistry::new()),
            backends: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &OrdererConfig {
        &self.config
    }

    /// Start serving the chain whose block 0 is `genesis`.
    ///
    /// A fresh ledger is seeded with `genesis` and its configuration is
    /// validated as the chain's first. A persistent ledger that already holds
    /// the chain must start with the same block; its latest committed
    /// configuration is restored.
    pub async fn bootstrap_chain(&self, genesis: Block) -> Result<ChainId> {
        let chain_id = check_genesis(&genesis)?;
        if self.registry.contains(&chain_id).await {
            return Err(OrdererError::ChainExists(chain_id));
        }

        let genesis_tx = genesis.data[0].clone();
        let ledger = self.open_ledger(&chain_id, genesis)?;
        let height = ledger.height().await?;

        let sequence = if height == 1 {
            self.configuration.apply_ordered(&genesis_tx).await?
        } else {
            let latest = latest_configuration(&chain_id, ledger.as_ref()).await?;
            self.configuration.restore(&chain_id, &latest).await?
        };

        let backend = Arc::new(SoloBackend::start(
            chain_id.clone(),
            ledger.clone(),
            self.configuration.clone(),
            self.config.batch.clone(),
        ));
        let context = ChainContext {
            ledger,
            backend: backend.clone(),
        };
        if let Err(e) = self.registry.insert(chain_id.clone(), context).await {
            backend.shutdown().await;
            return Err(e);
        }
        self.backends.lock().await.push(backend);

        info!(chain = %chain_id, height, sequence, "chain bootstrapped");
        Ok(chain_id)
    }

    fn open_ledger(&self, chain_id: &ChainId, genesis: Block) -> Result<Arc<dyn BlockLedger>> {
        match &self.config.ledger {
            LedgerConfig::Memory { max_blocks } => Ok(Arc::new(MemoryLedger::new(genesis, *max_blocks))),
            LedgerConfig::Sqlite { directory } => {
                std::fs::create_dir_all(directory)?;
                let path = directory.join(format!("{chain_id}.sqlite"));
                debug!(chain = %chain_id, path = %path.display(), "opening ledger");
                Ok(Arc::new(SqliteLedger::open(path, genesis)?))
            }
        }
    }

    /// A Broadcast handler over this orderer's chains.
    pub fn broadcast_handler(&self) -> BroadcastHandler {
        BroadcastHandler::with_verifier(
            self.registry.clone(),
            self.config.broadcast.clone(),
            self.verifier.clone(),
        )
    }

    /// A Deliver handler over this orderer's chains.
    pub fn deliver_handler(&self) -> DeliverHandler {
        let ledgers: Arc<dyn LedgerProvider> = self.registry.clone();
        DeliverHandler::new(ledgers, self.config.deliver.clone())
    }

    pub fn configuration(&self) -> &Arc<ConfigurationManager> {
        &self.configuration
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.registry
    }

    pub async fn ledger(&self, chain_id: &ChainId) -> Option<Arc<dyn BlockLedger>> {
        self.registry.ledger(chain_id).await
    }

    pub async fn chains(&self) -> Vec<ChainId> {
        self.registry.chains().await
    }

    /// Stop every ordering task after committing what each has pending.
    pub async fn shutdown(&self) {
        let backends = std::mem::take(&mut *self.backends.lock().await);
        for backend in backends {
            backend.shutdown().await;
        }
    }
}

/// Check that `genesis` can start a chain, returning the chain id.
fn check_genesis(genesis: &Block) -> Result<ChainId> {
    if genesis.number() != 0 || genesis.header.previous_hash != Blake3Hash::ZERO {
        return Err(OrdererError::InvalidGenesis("not block 0".into()));
    }
    if !genesis.verify_data_hash() {
        return Err(OrdererError::InvalidGenesis("data hash mismatch".into()));
    }
    let [tx] = genesis.data.as_slice() else {
        return Err(OrdererError::InvalidGenesis(format!(
            "expected one transaction, found {}",
            genesis.data.len()
        )));
    };
    if !tx.is_configuration() {
        return Err(OrdererError::InvalidGenesis(
            "transaction is not a configuration transaction".into(),
        ));
    }

    let chain_id = tx.chain_id().clone();
    if !is_valid_chain_id(chain_id.as_str()) {
        return Err(OrdererError::InvalidChainId(chain_id));
    }
    Ok(chain_id)
}

/// Lowercase letters, digits, `.`, `-` and `_`, starting with a letter or
/// digit. Chain ids also name ledger files.
fn is_valid_chain_id(id: &str) -> bool {
    let mut chars = id.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    id.len() <= MAX_CHAIN_ID_LEN
        && (first.is_ascii_lowercase() || first.is_ascii_digit())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'))
}

/// The newest configuration committed on `ledger`.
async fn latest_configuration(
    chain_id: &ChainId,
    ledger: &dyn BlockLedger,
) -> Result<ConfigurationEnvelope> {
    let oldest = ledger.oldest_retained().await?;
    let mut number = ledger.height().await?;

    while number > oldest {
        number -= 1;
        let ReadOutcome::Block(block) = ledger.read_block(number).await? else {
            break;
        };
        if let Some(tx) = block.data.iter().rev().find(|tx| tx.is_configuration()) {
            return Ok(tx.configuration_envelope().map_err(ConfigError::from)?);
        }
    }

    Err(OrdererError::ConfigurationNotFound(chain_id.clone()))
}
