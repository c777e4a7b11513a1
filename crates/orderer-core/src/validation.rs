//! Envelope validation: checks performed at ingress.
//!
//! Authorization of configuration changes happens when the change is
//! ordered, not here.

use crate::canonical::envelope_signed_message;
use crate::crypto::SignatureVerifier;
use crate::envelope::Envelope;
use crate::error::ValidationError;

/// Default maximum size of an envelope's data.
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// Validate an envelope's structure.
///
/// This performs:
/// - Chain id presence
/// - Data size limit
/// - Configuration payload decoding (for configuration transactions)
pub fn validate_envelope(envelope: &Envelope, max_data_bytes: usize) -> Result<(), ValidationError> {
    // 1. Must name a chain
    if envelope.chain_id().is_empty() {
        return Err(ValidationError::EmptyChainId);
    }

    // 2. Size limit
    if envelope.data.len() > max_data_bytes {
        return Err(ValidationError::TooLarge {
            size: envelope.data.len(),
            max: max_data_bytes,
        });
    }

    // 3. Configuration transactions must carry a decodable snapshot
    if envelope.is_configuration() {
        envelope.configuration_envelope()?;
    }

    Ok(())
}

/// Check the creator's signature over header and data.
///
/// Envelopes without a creator are anonymous and must carry no signature.
pub fn verify_envelope_signature(
    envelope: &Envelope,
    verifier: &dyn SignatureVerifier,
) -> Result<(), ValidationError> {
    match &envelope.header.creator {
        None if envelope.signature.is_empty() => Ok(()),
        None => Err(ValidationError::SignatureWithoutCreator),
        Some(creator) => {
            if verifier.verify(creator, &envelope_signed_message(envelope), &envelope.signature) {
                Ok(())
            } else {
                Err(ValidationError::BadSignature)
            }
        }
    }
}
