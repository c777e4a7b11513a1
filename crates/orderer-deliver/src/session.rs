//! The per-stream Deliver state machine.
//!
//! Pure: the session never touches a ledger or a transport. The driver
//! feeds it client updates and reports every block it sends; the session
//! says whether another block may go out.

use crate::config::StaleAck;
use crate::error::{DeliverError, Result};
use crate::messages::{DeliverUpdate, SeekInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No seek received yet.
    AwaitSeek,
    /// A seek is being resolved against the ledger.
    Locating,
    /// Blocks flow while the window is open.
    Streaming,
    /// The window is full; waiting for an acknowledgement or a new seek.
    Blocked,
    /// Terminal.
    Closed,
}

/// What the driver must do after an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Nothing beyond what the session already does.
    Continue,
    /// Drop the current cursor and position a new one for this seek, then
    /// call [`DeliverSession::located`].
    Locate(SeekInfo),
}

#[derive(Debug, Clone)]
pub struct DeliverSession {
    state: SessionState,
    /// Oldest unacknowledged block.
    base: u64,
    /// Next block to send.
    next: u64,
    /// 0 means unlimited.
    window_size: u64,
    /// Window size requested by the seek being located.
    pending_window: u64,
    stale_ack: StaleAck,
}

impl DeliverSession {
    pub fn new(stale_ack: StaleAck) -> Self {
        Self {
            state: SessionState::AwaitSeek,
            base: 0,
            next: 0,
            window_size: 0,
            pending_window: 0,
            stale_ack,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn next(&self) -> u64 {
        self.next
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    /// Blocks sent but not yet acknowledged.
    pub fn unacknowledged(&self) -> u64 {
        self.next - self.base
    }

    fn window_open(&self) -> bool {
        self.window_size == 0 || self.unacknowledged() < self.window_size
    }

    fn settle(&mut self) {
        self.state = if self.window_open() {
            SessionState::Streaming
        } else {
            SessionState::Blocked
        };
    }

    /// Whether the driver may send the next block now.
    pub fn can_send(&self) -> bool {
        self.state == SessionState::Streaming
    }

    /// Apply a client update. An error means the stream must close with
    /// the error's status; the session is already closed when it returns.
    pub fn on_update(&mut self, update: DeliverUpdate) -> Result<Step> {
        let result = self.apply(update);
        if result.is_err() {
            self.close();
        }
        result
    }

    fn apply(&mut self, update: DeliverUpdate) -> Result<Step> {
        match update {
            _ if self.state == SessionState::Closed => Ok(Step::Continue),
            DeliverUpdate::Seek(seek) => {
                if seek.chain_id.is_empty() {
                    return Err(DeliverError::Protocol("seek without chain id".into()));
                }
                self.state = SessionState::Locating;
                self.pending_window = seek.window_size;
                Ok(Step::Locate(seek))
            }
            DeliverUpdate::Acknowledgement { number } => match self.state {
                SessionState::AwaitSeek | SessionState::Locating => Err(DeliverError::Protocol(
                    "acknowledgement before the stream is positioned".into(),
                )),
                _ if number >= self.next => Err(DeliverError::Protocol(format!(
                    "acknowledgement of block {number} which was not sent"
                ))),
                _ if number < self.base => match self.stale_ack {
                    StaleAck::Reject => Err(DeliverError::Protocol(format!(
                        "stale acknowledgement of block {number}, window starts at {}",
                        self.base
                    ))),
                    StaleAck::Ignore => Ok(Step::Continue),
                },
                _ => {
                    self.base = number + 1;
                    self.settle();
                    Ok(Step::Continue)
                }
            },
        }
    }

    /// The cursor for the pending seek starts at `position`.
    pub fn located(&mut self, position: u64) {
        if self.state != SessionState::Locating {
            return;
        }
        self.base = position;
        self.next = position;
        self.window_size = self.pending_window;
        self.settle();
    }

    /// Block `self.next()` was delivered to the client.
    pub fn on_block_sent(&mut self) {
        if self.state != SessionState::Streaming {
            return;
        }
        self.next += 1;
        self.settle();
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }
}
