//! The ordering backend seam.

use async_trait::async_trait;

use orderer_core::Envelope;

use crate::error::SubmitError;

/// Anything that can take envelopes into a chain's ordering path.
///
/// `submit` returns once the envelope is admitted; ordering and commit happen
/// later. Implementations must not block waiting for queue space.
#[async_trait]
pub trait OrderingBackend: Send + Sync {
    async fn submit(&self, envelope: Envelope) -> Result<(), SubmitError>;
}
