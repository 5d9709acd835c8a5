use bastion_crypto::CanonicalHasher;
use bastion_types::{Digest, Execution, MetaTxParams, PaymentDetails, RecordSnapshot, Selector};

/// Versioned domain tag of the signing scheme. Bump on any layout change.
pub const METATX_DOMAIN: &str = "bastion-metatx-v1";

/// Canonical signing digest of a meta-transaction.
///
/// Field order is fixed: chain, verifier, nonce, record snapshot, then the
/// signer's commitment (handler, action, deadline, gas cap, signer).
pub fn build_digest(snapshot: &RecordSnapshot, params: &MetaTxParams) -> Digest {
    let mut h = CanonicalHasher::new(METATX_DOMAIN);
    h.u64(params.chain_id)
        .fixed(params.handler_contract.as_bytes())
        .u64(params.nonce)
        .u64(snapshot.tx_id.0);

    let tx = &snapshot.params;
    h.fixed(tx.requester.as_bytes())
        .fixed(tx.target.as_bytes())
        .u128(tx.value)
        .u64(tx.gas_limit)
        .fixed(tx.operation_type.as_bytes())
        .u8(tx.execution_type().ordinal());
    match &tx.execution {
        Execution::None => {}
        Execution::Standard { selector, params } => {
            h.fixed(selector.as_bytes()).bytes(params);
        }
        Execution::Raw { payload } => {
            h.bytes(payload);
        }
    }
    h.optional(snapshot.payment.as_ref(), encode_payment);

    h.fixed(params.handler_selector.as_bytes())
        .u8(params.action.ordinal())
        .u64(params.deadline)
        .u128(params.max_gas_price)
        .fixed(params.signer.as_bytes());
    h.finish()
}

fn encode_payment(h: &mut CanonicalHasher, payment: &PaymentDetails) {
    h.fixed(payment.recipient.as_bytes())
        .u128(payment.native_amount)
        .optional(payment.token.as_ref(), |h, token| {
            h.fixed(token.as_bytes());
        })
        .u128(payment.token_amount);
}

/// Call data a relayer submits: the handler selector followed by the digest.
pub fn encode_call_data(handler_selector: Selector, digest: &Digest) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 32);
    out.extend_from_slice(handler_selector.as_bytes());
    out.extend_from_slice(digest.as_bytes());
    out
}
