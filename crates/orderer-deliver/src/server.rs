//! Serving Deliver streams.

use std::future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use orderer_core::{Block, ChainId, Identity};
use orderer_ledger::{BlockCursor, BlockLedger};

use crate::authorizer::{AllowAll, DeliverAuthorizer};
use crate::config::DeliverConfig;
use crate::error::{DeliverError, Result};
use crate::messages::{DeliverResponse, DeliverUpdate, SeekInfo};
use crate::session::{DeliverSession, Step};
use crate::transport::{Inbound, Outbound};

enum Event {
    Update(Option<DeliverUpdate>),
    Block(Result<Arc<Block>>),
}

/// Resolves a chain to its ledger.
#[async_trait]
pub trait LedgerProvider: Send + Sync {
    async fn ledger(&self, chain_id: &ChainId) -> Option<Arc<dyn BlockLedger>>;
}

/// Serves Deliver streams against the ledgers of a [`LedgerProvider`].
pub struct DeliverHandler {
    ledgers: Arc<dyn LedgerProvider>,
    authorizer: Arc<dyn DeliverAuthorizer>,
    config: DeliverConfig,
}

impl DeliverHandler {
    pub fn new(ledgers: Arc<dyn LedgerProvider>, config: DeliverConfig) -> Self {
        Self {
            ledgers,
            authorizer: Arc::new(AllowAll),
            config,
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn DeliverAuthorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Serve one anonymous stream. See [`handle_as`](Self::handle_as).
    pub async fn handle<I, O>(&self, inbound: I, outbound: O) -> Result<()>
    where
        I: Inbound<DeliverUpdate> + 'static,
        O: Outbound<DeliverResponse>,
    {
        self.handle_as(None, inbound, outbound).await
    }

    /// Serve one stream on behalf of `caller` until the client goes away or
    /// the stream fails.
    ///
    /// Returns `Ok` when the client closed the stream. On failure the client
    /// has been sent a terminal [`DeliverResponse::Error`] (if it is still
    /// listening) and the error is returned.
    pub async fn handle_as<I, O>(
        &self,
        caller: Option<Identity>,
        inbound: I,
        mut outbound: O,
    ) -> Result<()>
    where
        I: Inbound<DeliverUpdate> + 'static,
        O: Outbound<DeliverResponse>,
    {
        let (update_tx, update_rx) = mpsc::channel(self.config.update_buffer.max(1));
        let reader = tokio::spawn(forward_updates(inbound, update_tx));

        let result = self.produce(caller.as_ref(), update_rx, &mut outbound).await;
        reader.abort();

        match result {
            Ok(()) => {
                debug!("deliver stream closed by client");
                Ok(())
            }
            Err(e) => {
                let status = e.status();
                warn!(error = %e, %status, "deliver stream failed");
                // The client may already be gone; nothing else to do then
                let _ = outbound.send(DeliverResponse::Error(status)).await;
                Err(e)
            }
        }
    }

    async fn produce<O>(
        &self,
        caller: Option<&Identity>,
        mut updates: mpsc::Receiver<DeliverUpdate>,
        outbound: &mut O,
    ) -> Result<()>
    where
        O: Outbound<DeliverResponse>,
    {
        let mut session = DeliverSession::new(self.config.stale_ack);
        let mut cursor: Option<Box<dyn BlockCursor>> = None;

        loop {
            let sending = session.can_send() && cursor.is_some();

            let event = tokio::select! {
                biased;
                update = updates.recv() => Event::Update(update),
                block = next_block(&mut cursor), if sending => Event::Block(block),
            };

            match event {
                Event::Update(None) => {
                    session.close();
                    return Ok(());
                }
                Event::Update(Some(update)) => {
                    let Step::Locate(seek) = session.on_update(update)? else {
                        continue;
                    };
                    // Release the old position before taking a new one
                    cursor = None;
                    let located = match self.locate(caller, &seek).await {
                        Ok(located) => located,
                        Err(e) => {
                            session.close();
                            return Err(e);
                        }
                    };
                    info!(
                        chain = %seek.chain_id,
                        start = located.position(),
                        window = seek.window_size,
                        "seek resolved"
                    );
                    session.located(located.position());
                    cursor = Some(located);
                }
                Event::Block(Err(e)) => {
                    session.close();
                    return Err(e);
                }
                Event::Block(Ok(block)) => {
                    if outbound.send(DeliverResponse::Block(block)).await.is_err() {
                        session.close();
                        return Ok(());
                    }
                    session.on_block_sent();
                }
            }
        }
    }

    async fn locate(
        &self,
        caller: Option<&Identity>,
        seek: &SeekInfo,
    ) -> Result<Box<dyn BlockCursor>> {
        let ledger = self
            .ledgers
            .ledger(&seek.chain_id)
            .await
            .ok_or_else(|| DeliverError::UnknownChain(seek.chain_id.clone()))?;
        if !self.authorizer.authorize(caller, seek) {
            debug!(chain = %seek.chain_id, ?caller, "deliver read refused");
            return Err(DeliverError::Forbidden(seek.chain_id.clone()));
        }
        Ok(ledger.cursor(seek.start_position()).await?)
    }
}

async fn next_block(cursor: &mut Option<Box<dyn BlockCursor>>) -> Result<Arc<Block>> {
    match cursor {
        Some(cursor) => Ok(cursor.next_block().await?),
        None => future::pending().await,
    }
}

/// Reader task: move client updates into the producer's queue.
async fn forward_updates<I>(mut inbound: I, updates: mpsc::Sender<DeliverUpdate>)
where
    I: Inbound<DeliverUpdate>,
{
    while let Some(update) = inbound.recv().await {
        if updates.send(update).await.is_err() {
            break;
        }
    }
}
