//! Error types for the Orderer Core.

use thiserror::Error;

use crate::status::Status;

/// Core errors that can occur while encoding, decoding or signing.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Structural errors found in an envelope before it is handed to ordering.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("envelope has an empty chain id")]
    EmptyChainId,

    #[error("envelope data is {size} bytes, maximum is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("configuration transaction does not decode: {0}")]
    MalformedConfiguration(String),

    #[error("envelope carries a signature but names no creator")]
    SignatureWithoutCreator,

    #[error("envelope signature does not verify against its creator")]
    BadSignature,
}

impl ValidationError {
    /// A signature that fails to verify is refused; every other problem is
    /// malformed input.
    pub fn status(&self) -> Status {
        match self {
            ValidationError::BadSignature => Status::Forbidden,
            _ => Status::BadRequest,
        }
    }
}

impl From<CoreError> for ValidationError {
    fn from(e: CoreError) -> Self {
        ValidationError::MalformedConfiguration(e.to_string())
    }
}
