//! Cryptographic primitives for Bastion.
//!
//! - **SigningIdentity**: Ed25519 key pair whose verifying key is an [`Identity`]
//! - **verify_digest**: strict Ed25519 verification against an expected signer
//! - **CanonicalHasher**: domain-separated BLAKE3 encoder for signing digests
//!
//! [`Identity`]: bastion_types::Identity

#![deny(unsafe_code)]

pub mod digest;
pub mod error;
pub mod keys;

pub use digest::CanonicalHasher;
pub use error::CryptoError;
pub use keys::{verify_digest, SigningIdentity};
