use thiserror::Error;

/// Errors that can occur when building or checking macaroons
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MacaroonError {
    /// The entropy source could not produce a new key pair
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// The operation is not allowed in the macaroon's current phase
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// The macaroon has not been finalized yet
    #[error("Macaroon has not been finalized")]
    NotFinalized,

    /// A signature in the chain did not verify.
    ///
    /// Deliberately carries no indication of which link failed.
    #[error("Signature verification error")]
    BadSignature,

    /// The chain is intact but a caveat condition was not met
    #[error("Caveat not satisfied: {0}")]
    CaveatNotSatisfied(String),

    /// Invalid key length
    #[error("Invalid key length")]
    InvalidKeyLength,

    /// The macaroon's structure is invalid
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Failed to encode or decode the macaroon
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}
