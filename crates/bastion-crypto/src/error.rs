use thiserror::Error;

/// Errors from Bastion cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("identity is not a valid Ed25519 verifying key")]
    InvalidIdentity,

    #[error("signature must be 64 bytes, got {0}")]
    MalformedSignature(usize),

    #[error("signature verification failed")]
    VerificationFailed,
}
