//! Per-signer replay counters.

use std::collections::HashMap;

use bastion_types::Identity;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Current nonce per signer. A signer with no accepted meta-transaction is
/// at nonce 0.
#[derive(Debug, Default)]
pub struct NonceRegistry {
    nonces: HashMap<Identity, u64>,
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, signer: &Identity) -> u64 {
        self.nonces.get(signer).copied().unwrap_or(0)
    }

    /// Strictly asserts that `provided` is exactly the signer's next nonce.
    pub fn assert_next(&self, signer: &Identity, provided: u64) -> EngineResult<()> {
        let expected = self.current(signer);
        if provided != expected {
            return Err(EngineError::NonceReplayed {
                signer: *signer,
                expected,
                got: provided,
            });
        }
        Ok(())
    }

    /// Check and bump in one step. Returns the new nonce.
    pub fn consume(&mut self, signer: &Identity, provided: u64) -> EngineResult<u64> {
        self.assert_next(signer, provided)?;
        let next = provided
            .checked_add(1)
            .ok_or_else(|| EngineError::Invariant(format!("nonce overflow for {signer}")))?;
        self.nonces.insert(*signer, next);
        debug!(signer = %signer, nonce = next, "Nonce consumed");
        Ok(next)
    }
}
