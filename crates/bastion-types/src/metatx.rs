use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::ids::{Digest, Identity, Selector, TxId};
use crate::record::{PaymentDetails, TxParams, TxRecord};

/// Parameters a signer commits to alongside the record snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTxParams {
    pub chain_id: u64,
    /// Identity of the engine expected to verify the payload.
    pub handler_contract: Identity,
    pub handler_selector: Selector,
    /// One of the `SignMeta*` actions.
    pub action: Action,
    /// Unix seconds; the payload is rejected once `now > deadline`.
    pub deadline: u64,
    /// Upper bound on the relay gas price; 0 means unlimited.
    pub max_gas_price: u128,
    pub signer: Identity,
    pub nonce: u64,
}

/// The record as the signer saw it. `tx_id` is `TxId::UNALLOCATED` for a
/// request-and-approve payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub tx_id: TxId,
    pub params: TxParams,
    pub payment: Option<PaymentDetails>,
}

impl RecordSnapshot {
    pub fn new_request(params: TxParams) -> Self {
        Self {
            tx_id: TxId::UNALLOCATED,
            params,
            payment: None,
        }
    }
}

impl From<&TxRecord> for RecordSnapshot {
    fn from(record: &TxRecord) -> Self {
        Self {
            tx_id: record.id,
            params: record.params.clone(),
            payment: record.payment.clone(),
        }
    }
}

/// A meta-transaction ready to be signed by `params.signer`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedMetaTx {
    pub snapshot: RecordSnapshot,
    pub params: MetaTxParams,
    pub digest: Digest,
    pub encoded_call_data: Vec<u8>,
}

impl UnsignedMetaTx {
    pub fn into_signed(self, signature: Vec<u8>) -> SignedMetaTx {
        SignedMetaTx {
            snapshot: self.snapshot,
            params: self.params,
            digest: self.digest,
            signature,
            encoded_call_data: self.encoded_call_data,
        }
    }
}

/// The wire payload a relayer submits verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMetaTx {
    pub snapshot: RecordSnapshot,
    pub params: MetaTxParams,
    pub digest: Digest,
    /// Ed25519 signature over the digest bytes.
    pub signature: Vec<u8>,
    pub encoded_call_data: Vec<u8>,
}

impl SignedMetaTx {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
