//! Shared setup for the orderer integration tests.

#![allow(dead_code)]

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use tokio::task::JoinHandle;

use orderer::deliver::transport::memory::{duplex, ClientEnd};
use orderer::deliver::{DeliverResponse, DeliverUpdate, Inbound, Outbound, SeekInfo};
use orderer::ledger::BlockLedger;
use orderer::{Block, BroadcastResponse, Envelope, Orderer, Status};

pub const WAIT: Duration = Duration::from_secs(10);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Send `envelopes` over one Broadcast stream and collect the statuses.
pub async fn broadcast(orderer: &Orderer, envelopes: Vec<Envelope>) -> Result<Vec<Status>> {
    let handler = orderer.broadcast_handler();
    let (mut client, server) = duplex::<Envelope, BroadcastResponse>(envelopes.len().max(1));
    let serving = tokio::spawn(async move { handler.handle(server.requests, server.responses).await });

    for envelope in envelopes {
        client.requests.send(envelope).await?;
    }
    drop(client.requests);

    let mut statuses = Vec::new();
    while let Some(response) = client.responses.recv().await {
        statuses.push(response.status);
    }
    serving.await??;
    Ok(statuses)
}

/// Wait until `ledger` reaches `height`.
pub async fn wait_for_height(ledger: &dyn BlockLedger, height: u64) -> Result<()> {
    let mut heights = ledger.subscribe();
    tokio::time::timeout(WAIT, heights.wait_for(|h| *h >= height))
        .await
        .map_err(|_| anyhow!("ledger never reached height {height}"))??;
    Ok(())
}

/// A Deliver stream against an orderer.
pub struct DeliverClient {
    end: ClientEnd<DeliverUpdate, DeliverResponse>,
    serving: JoinHandle<orderer::deliver::Result<()>>,
}

impl DeliverClient {
    pub fn open(orderer: &Orderer) -> Self {
        let handler = orderer.deliver_handler();
        let (end, server) = duplex::<DeliverUpdate, DeliverResponse>(16);
        let serving = tokio::spawn(async move { handler.handle(server.requests, server.responses).await });
        Self { end, serving }
    }

    pub async fn seek(&mut self, seek: SeekInfo) -> Result<()> {
        self.end.requests.send(DeliverUpdate::Seek(seek)).await?;
        Ok(())
    }

    pub async fn ack(&mut self, number: u64) -> Result<()> {
        self.end
            .requests
            .send(DeliverUpdate::Acknowledgement { number })
            .await?;
        Ok(())
    }

    pub async fn next(&mut self) -> Result<DeliverResponse> {
        tokio::time::timeout(WAIT, self.end.responses.recv())
            .await
            .map_err(|_| anyhow!("no deliver response"))?
            .ok_or_else(|| anyhow!("deliver stream ended"))
    }

    pub async fn next_block(&mut self) -> Result<Block> {
        match self.next().await? {
            DeliverResponse::Block(block) => Ok((*block).clone()),
            DeliverResponse::Error(status) => bail!("deliver failed with {status}"),
        }
    }

    /// Nothing arrives within `wait`.
    pub async fn assert_quiet(&mut self, wait: Duration) -> Result<()> {
        match tokio::time::timeout(wait, self.end.responses.recv()).await {
            Err(_) => Ok(()),
            Ok(response) => bail!("unexpected deliver response: {response:?}"),
        }
    }

    pub async fn close(self) -> Result<()> {
        drop(self.end);
        self.serving.await??;
        Ok(())
    }
}
