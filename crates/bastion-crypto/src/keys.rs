use bastion_types::{Digest, Identity};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// An Ed25519 key pair whose verifying key is the holder's [`Identity`].
pub struct SigningIdentity {
    key: SigningKey,
}

impl SigningIdentity {
    /// Deterministic key pair from a 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
        }
    }

    /// Fresh key pair from the operating system RNG.
    pub fn generate() -> Self {
        let mut seed = Zeroizing::new([0u8; 32]);
        rand::rngs::OsRng.fill_bytes(&mut seed[..]);
        Self {
            key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::from_bytes(self.key.verifying_key().to_bytes())
    }

    /// Sign the raw digest bytes.
    pub fn sign_digest(&self, digest: &Digest) -> Vec<u8> {
        self.key.sign(digest.as_bytes()).to_bytes().to_vec()
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("identity", &self.identity())
            .finish_non_exhaustive()
    }
}

/// Verify `signature` over `digest` against the expected signer identity.
pub fn verify_digest(
    signer: &Identity,
    digest: &Digest,
    signature: &[u8],
) -> Result<(), CryptoError> {
    let sig_bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| CryptoError::MalformedSignature(signature.len()))?;
    let verifying_key =
        VerifyingKey::from_bytes(signer.as_bytes()).map_err(|_| CryptoError::InvalidIdentity)?;
    let signature = Signature::from_bytes(&sig_bytes);
    verifying_key
        .verify_strict(digest.as_bytes(), &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}
