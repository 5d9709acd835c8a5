//! Meta-transaction verification.
//!
//! A signer commits to a record snapshot plus [`MetaTxParams`] by signing
//! the canonical digest; a relayer submits the resulting [`SignedMetaTx`].
//! The verifier checks every binding and only then consumes the signer's
//! nonce.

pub mod digest;
pub mod nonce;

use bastion_crypto::verify_digest;
use bastion_types::{
    Action, Identity, MetaTxParams, RecordSnapshot, Selector, SignedMetaTx, UnsignedMetaTx,
};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

pub use digest::{build_digest, encode_call_data, METATX_DOMAIN};
pub use nonce::NonceRegistry;

/// Relay-side facts that are not part of the signed payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayContext {
    pub relayer: Identity,
    pub gas_price: u128,
}

impl RelayContext {
    pub fn new(relayer: Identity) -> Self {
        Self {
            relayer,
            gas_price: 0,
        }
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }
}

#[derive(Debug)]
pub struct MetaTransactionVerifier {
    chain_id: u64,
    verifier: Identity,
    nonces: NonceRegistry,
}

impl MetaTransactionVerifier {
    /// `verifier` is the identity payloads must name as `handler_contract`.
    pub fn new(chain_id: u64, verifier: Identity) -> Self {
        Self {
            chain_id,
            verifier,
            nonces: NonceRegistry::new(),
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn verifier_identity(&self) -> Identity {
        self.verifier
    }

    pub fn nonce(&self, signer: &Identity) -> u64 {
        self.nonces.current(signer)
    }

    /// Params bound to this verifier and the signer's current nonce.
    pub fn params(
        &self,
        handler_selector: Selector,
        action: Action,
        deadline: u64,
        max_gas_price: u128,
        signer: Identity,
    ) -> MetaTxParams {
        MetaTxParams {
            chain_id: self.chain_id,
            handler_contract: self.verifier,
            handler_selector,
            action,
            deadline,
            max_gas_price,
            signer,
            nonce: self.nonces.current(&signer),
        }
    }

    pub fn prepare(&self, snapshot: RecordSnapshot, params: MetaTxParams) -> UnsignedMetaTx {
        let digest = build_digest(&snapshot, &params);
        let encoded_call_data = encode_call_data(params.handler_selector, &digest);
        UnsignedMetaTx {
            snapshot,
            params,
            digest,
            encoded_call_data,
        }
    }

    /// Run every check without consuming the nonce.
    pub fn check(&self, tx: &SignedMetaTx, now: u64, gas_price: u128) -> EngineResult<()> {
        let params = &tx.params;
        if params.chain_id != self.chain_id {
            return Err(EngineError::ChainIdMismatch {
                expected: self.chain_id,
                got: params.chain_id,
            });
        }
        if params.handler_contract != self.verifier {
            return Err(EngineError::HandlerContractMismatch {
                got: params.handler_contract,
            });
        }

        let digest = build_digest(&tx.snapshot, params);
        if digest != tx.digest {
            return Err(EngineError::DigestMismatch);
        }
        if tx.encoded_call_data != encode_call_data(params.handler_selector, &digest) {
            return Err(EngineError::CallDataMismatch);
        }
        verify_digest(&params.signer, &digest, &tx.signature)?;

        if now > params.deadline {
            return Err(EngineError::Expired {
                deadline: params.deadline,
                now,
            });
        }
        if params.max_gas_price != 0 && gas_price > params.max_gas_price {
            return Err(EngineError::GasPriceExceeded {
                max: params.max_gas_price,
                actual: gas_price,
            });
        }
        self.nonces.assert_next(&params.signer, params.nonce)?;

        debug!(
            signer = %params.signer,
            nonce = params.nonce,
            digest = %digest,
            "Meta-transaction verified"
        );
        Ok(())
    }

    /// Consume the signer's nonce for an already checked payload.
    pub fn consume(&mut self, tx: &SignedMetaTx) -> EngineResult<u64> {
        self.nonces.consume(&tx.params.signer, tx.params.nonce)
    }

    /// [`check`](Self::check) then [`consume`](Self::consume).
    pub fn verify(&mut self, tx: &SignedMetaTx, now: u64, gas_price: u128) -> EngineResult<u64> {
        self.check(tx, now, gas_price)?;
        self.consume(tx)
    }
}
