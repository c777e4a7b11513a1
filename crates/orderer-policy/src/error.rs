//! Error types for the policy module.

use thiserror::Error;

/// Structural problems found while loading a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Envelope version is not understood.
    #[error("unsupported policy version: {0}")]
    UnsupportedVersion(u32),

    /// A `SignedBy` leaf points past the identity list.
    #[error("identity index {index} out of range for {identities} identities")]
    IndexOutOfRange { index: u32, identities: usize },

    /// An `NOutOf` node asks for more children than it has.
    #[error("threshold {n} exceeds {children} child policies")]
    ThresholdOutOfRange { n: u32, children: usize },

    /// The tree is deeper than the configured limit.
    #[error("policy depth exceeds limit of {max}")]
    TooDeep { max: usize },

    /// The policy bytes are not a signature policy envelope.
    #[error("policy does not decode: {0}")]
    Decode(String),

    /// The policy could not be serialized.
    #[error("policy encoding failed: {0}")]
    Encode(String),

    /// A Policy-typed configuration item holds an invalid policy.
    #[error("policy item {name} is invalid: {source}")]
    InvalidItem {
        name: String,
        #[source]
        source: Box<PolicyError>,
    },
}

/// Result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
