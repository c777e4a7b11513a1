//! Broadcast ingress.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use orderer_core::{
    validate_envelope, verify_envelope_signature, Ed25519Verifier, Envelope, SignatureVerifier, Status,
};
use orderer_deliver::{Inbound, Outbound, TransportError};

use crate::config::BroadcastConfig;
use crate::registry::ChainRegistry;

/// The answer to one broadcast envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub status: Status,
}

/// Admits envelopes into their chain's ordering backend.
///
/// `SUCCESS` means admitted, not committed. A configuration transaction is
/// validated only once it is ordered. An envelope naming a creator must be
/// signed by it.
#[derive(Clone)]
pub struct BroadcastHandler {
    registry: Arc<ChainRegistry>,
    config: BroadcastConfig,
    verifier: Arc<dyn SignatureVerifier>,
}

impl BroadcastHandler {
    pub fn new(registry: Arc<ChainRegistry>, config: BroadcastConfig) -> Self {
        Self::with_verifier(registry, config, Arc::new(Ed25519Verifier))
    }

    pub fn with_verifier(
        registry: Arc<ChainRegistry>,
        config: BroadcastConfig,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        Self {
            registry,
            config,
            verifier,
        }
    }

    /// Admit one envelope.
    pub async fn submit(&self, envelope: Envelope) -> Status {
        let checked = validate_envelope(&envelope, self.config.max_message_bytes)
            .and_then(|()| verify_envelope_signature(&envelope, self.verifier.as_ref()));
        if let Err(e) = checked {
            debug!(chain = %envelope.chain_id(), error = %e, "broadcast rejected");
            return e.status();
        }

        let Some(chain) = self.registry.get(envelope.chain_id()).await else {
            debug!(chain = %envelope.chain_id(), "broadcast for unknown chain");
            return Status::NotFound;
        };

        let chain_id = envelope.chain_id().clone();
        match chain.backend.submit(envelope).await {
            Ok(()) => Status::Success,
            Err(e) => {
                warn!(chain = %chain_id, error = %e, "broadcast not admitted");
                e.status()
            }
        }
    }

    /// Serve one stream: a response per envelope, in order, each sent before
    /// the next envelope is read.
    ///
    /// Returns `Ok` once the client finishes sending, or the transport error
    /// if it stops listening.
    pub async fn handle<I, O>(&self, mut inbound: I, mut outbound: O) -> Result<(), TransportError>
    where
        I: Inbound<Envelope>,
        O: Outbound<BroadcastResponse>,
    {
        while let Some(envelope) = inbound.recv().await {
            let status = self.submit(envelope).await;
            outbound.send(BroadcastResponse { status }).await?;
        }
        debug!("broadcast stream closed by client");
        Ok(())
    }
}
