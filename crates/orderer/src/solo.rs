//! Single-node ordering.
//!
//! One task per chain drains a bounded queue and cuts blocks. It is the only
//! writer of the chain's ledger.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use orderer_configtx::ConfigurationManager;
use orderer_core::{ChainId, Envelope};
use orderer_ledger::{BlockLedger, Result as LedgerResult};

use crate::backend::OrderingBackend;
use crate::config::BatchConfig;
use crate::error::SubmitError;

/// Orders a chain's envelopes on a background task.
///
/// - Messages are batched; a block is cut when `max_message_count` are
///   pending or `batch_timeout` after the first of them arrived
/// - A configuration transaction first flushes the pending batch, is then
///   validated by the [`ConfigurationManager`], and on acceptance is
///   committed in a block by itself; rejected ones are dropped. The new
///   configuration becomes current only after its block is appended
/// - A ledger failure stops the task; later submissions fail with
///   [`SubmitError::Stopped`]
pub struct SoloBackend {
    chain_id: ChainId,
    queue: mpsc::Sender<Envelope>,
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SoloBackend {
    /// Spawn the ordering task. Must be called inside a tokio runtime.
    pub fn start(
        chain_id: ChainId,
        ledger: Arc<dyn BlockLedger>,
        configuration: Arc<ConfigurationManager>,
        batch: BatchConfig,
    ) -> Self {
        let (queue, received) = mpsc::channel(batch.queue_capacity.max(1));
        let (stop, stopped) = watch::channel(false);

        let worker = Worker {
            chain_id: chain_id.clone(),
            ledger,
            configuration,
            batch,
            pending: Vec::new(),
        };
        let task = tokio::spawn(worker.run(received, stopped));

        Self {
            chain_id,
            queue,
            stop,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    /// Whether the ordering task is still accepting envelopes.
    pub fn is_running(&self) -> bool {
        !self.queue.is_closed()
    }

    /// Stop ordering, committing whatever is pending, and wait for the task.
    pub async fn shutdown(&self) {
        let _ = self.stop.send(true);
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!(chain = %self.chain_id, error = %e, "ordering task ended abnormally");
            }
        }
    }
}

#[async_trait]
impl OrderingBackend for SoloBackend {
    async fn submit(&self, envelope: Envelope) -> Result<(), SubmitError> {
        self.queue.try_send(envelope).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SubmitError::Stopped,
        })
    }
}

enum Event {
    Received(Option<Envelope>),
    Timeout,
    Stop,
}

struct Worker {
    chain_id: ChainId,
    ledger: Arc<dyn BlockLedger>,
    configuration: Arc<ConfigurationManager>,
    batch: BatchConfig,
    pending: Vec<Envelope>,
}

impl Worker {
    async fn run(mut self, mut received: mpsc::Receiver<Envelope>, mut stop: watch::Receiver<bool>) {
        debug!(chain = %self.chain_id, "ordering started");
        match self.order(&mut received, &mut stop).await {
            Ok(()) => debug!(chain = %self.chain_id, "ordering stopped"),
            Err(e) => error!(chain = %self.chain_id, error = %e, "ordering halted by ledger failure"),
        }
        // Dropping the receiver here makes further submissions fail
    }

    async fn order(
        &mut self,
        received: &mut mpsc::Receiver<Envelope>,
        stop: &mut watch::Receiver<bool>,
    ) -> LedgerResult<()> {
        let mut deadline: Option<Instant> = None;

        loop {
            let timer = sleep_until(deadline.unwrap_or_else(Instant::now));
            let event = tokio::select! {
                biased;
                _ = stop.changed() => Event::Stop,
                envelope = received.recv() => Event::Received(envelope),
                _ = timer, if deadline.is_some() => Event::Timeout,
            };

            match event {
                Event::Received(Some(envelope)) if envelope.is_configuration() => {
                    self.cut().await?;
                    deadline = None;
                    self.order_configuration(envelope).await?;
                }
                Event::Received(Some(envelope)) => {
                    self.pending.push(envelope);
                    if self.pending.len() >= self.batch.max_message_count.max(1) {
                        self.cut().await?;
                        deadline = None;
                    } else if deadline.is_none() {
                        deadline = Some(Instant::now() + self.batch.batch_timeout());
                    }
                }
                Event::Timeout => {
                    self.cut().await?;
                    deadline = None;
                }
                Event::Received(None) | Event::Stop => {
                    received.close();
                    while let Ok(envelope) = received.try_recv() {
                        if envelope.is_configuration() {
                            self.cut().await?;
                            self.order_configuration(envelope).await?;
                        } else {
                            self.pending.push(envelope);
                        }
                    }
                    return self.cut().await;
                }
            }
        }
    }

    /// Commit the pending batch, if any.
    async fn cut(&mut self) -> LedgerResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        let count = batch.len();
        let block = self.ledger.append(batch).await?;
        info!(chain = %self.chain_id, number = block.number(), envelopes = count, "block cut");
        Ok(())
    }

    /// Validate, commit, then install. Nothing is installed unless the
    /// block reached the ledger.
    async fn order_configuration(&mut self, envelope: Envelope) -> LedgerResult<()> {
        let staged = match self.configuration.stage_ordered(&envelope).await {
            Ok(staged) => staged,
            Err(e) => {
                warn!(
                    chain = %self.chain_id,
                    error = %e,
                    status = %e.status(),
                    "configuration transaction rejected"
                );
                return Ok(());
            }
        };

        let block = self.ledger.append(vec![envelope]).await?;
        match self.configuration.install(staged).await {
            Ok(sequence) => info!(
                chain = %self.chain_id,
                number = block.number(),
                sequence,
                "configuration block cut"
            ),
            Err(e) => error!(
                chain = %self.chain_id,
                number = block.number(),
                error = %e,
                "committed configuration could not be installed"
            ),
        }
        Ok(())
    }
}
