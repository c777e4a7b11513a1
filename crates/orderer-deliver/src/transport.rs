//! Stream transport abstraction.
//!
//! A bidirectional stream is split into an [`Inbound`] half the server reads
//! client messages from and an [`Outbound`] half it writes responses to.
//! Implementations may sit on gRPC, WebSockets, or anything else that
//! preserves order.

use async_trait::async_trait;
use thiserror::Error;

/// The peer is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stream closed by peer")]
pub struct TransportError;

/// Receiving half of a stream.
#[async_trait]
pub trait Inbound<T>: Send {
    /// Next message, or `None` once the peer has finished sending.
    async fn recv(&mut self) -> Option<T>;
}

/// Sending half of a stream.
#[async_trait]
pub trait Outbound<T>: Send {
    /// Send one message, waiting for buffer space.
    async fn send(&mut self, message: T) -> Result<(), TransportError>;
}

/// An in-memory transport for testing and in-process clients.
///
/// Each direction is a bounded `tokio::sync::mpsc` channel.
pub mod memory {
    use super::*;
    use tokio::sync::mpsc;

    pub struct ChannelInbound<T>(mpsc::Receiver<T>);

    pub struct ChannelOutbound<T>(mpsc::Sender<T>);

    #[async_trait]
    impl<T: Send> Inbound<T> for ChannelInbound<T> {
        async fn recv(&mut self) -> Option<T> {
            self.0.recv().await
        }
    }

    #[async_trait]
    impl<T: Send> Outbound<T> for ChannelOutbound<T> {
        async fn send(&mut self, message: T) -> Result<(), TransportError> {
            self.0.send(message).await.map_err(|_| TransportError)
        }
    }

    /// A one-directional stream.
    pub fn channel<T>(capacity: usize) -> (ChannelOutbound<T>, ChannelInbound<T>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (ChannelOutbound(tx), ChannelInbound(rx))
    }

    /// The client's ends of a bidirectional stream.
    pub struct ClientEnd<Req, Resp> {
        pub requests: ChannelOutbound<Req>,
        pub responses: ChannelInbound<Resp>,
    }

    /// The server's ends of a bidirectional stream.
    pub struct ServerEnd<Req, Resp> {
        pub requests: ChannelInbound<Req>,
        pub responses: ChannelOutbound<Resp>,
    }

    /// A connected client/server pair with `capacity` messages of buffer in
    /// each direction.
    pub fn duplex<Req, Resp>(capacity: usize) -> (ClientEnd<Req, Resp>, ServerEnd<Req, Resp>) {
        let (req_tx, req_rx) = channel(capacity);
        let (resp_tx, resp_rx) = channel(capacity);
        (
            ClientEnd {
                requests: req_tx,
                responses: resp_rx,
            },
            ServerEnd {
                requests: req_rx,
                responses: resp_tx,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::memory::duplex;
    use super::*;

    #[tokio::test]
    async fn test_duplex_carries_both_directions() {
        let (mut client, mut server) = duplex::<u32, String>(4);

        client.requests.send(7).await.unwrap();
        assert_eq!(server.requests.recv().await, Some(7));

        server.responses.send("seven".to_string()).await.unwrap();
        assert_eq!(client.responses.recv().await.as_deref(), Some("seven"));
    }

    #[tokio::test]
    async fn test_dropped_peer_is_observed() {
        let (client, mut server) = duplex::<u32, u32>(4);
        drop(client);
        assert_eq!(server.requests.recv().await, None);
        assert_eq!(server.responses.send(1).await, Err(TransportError));
    }
}
