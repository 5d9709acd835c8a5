//! Shared fixture: an engine with an `ADDR_UPDATE` operation (60s time-lock)
//! and one role per lifecycle duty.

#![allow(dead_code)]

use bastion_crypto::SigningIdentity;
use bastion_engine::{
    Collaborators, EngineConfig, FunctionSchema, ManualClock, MemoryEventSink, OperationOverride,
    RecordingDispatcher, RelayContext, SecureOperationEngine, WorkflowPath,
};
use bastion_types::{
    Action, Execution, Identity, OperationTypeId, RecordSnapshot, Selector, SignedMetaTx, TxId,
    TxParams,
};

pub const T0: u64 = 1_700_000_000;
pub const CHAIN_ID: u64 = 31337;
pub const ADDR_UPDATE: &str = "ADDR_UPDATE";
pub const ADDR_PERIOD: u64 = 60;
pub const DEFAULT_PERIOD: u64 = 3600;
/// Validity window of payloads signed through the fixture helpers.
pub const VALIDITY: u64 = 3600;
/// Deadline of a payload signed at `T0`.
pub const DEADLINE: u64 = T0 + VALIDITY;

pub const REQUEST_HANDLER: &str = "updateAddressRequest(address)";
pub const META_HANDLER: &str = "updateAddressWithMetaTx(address)";
pub const SET_ADDRESS: &str = "setAddress(address)";

pub fn engine_identity() -> Identity {
    Identity::from_bytes([0xee; 32])
}

pub fn target() -> Identity {
    Identity::from_bytes([0x77; 32])
}

pub fn key(seed: u8) -> SigningIdentity {
    SigningIdentity::from_seed([seed; 32])
}

pub fn base_config() -> EngineConfig {
    let mut config = EngineConfig {
        chain_id: CHAIN_ID,
        engine_identity: engine_identity().to_hex(),
        owner: Some(key(1).identity().to_hex()),
        ..EngineConfig::default()
    };
    config.timelock.default_period_secs = DEFAULT_PERIOD;
    config.timelock.overrides.insert(
        ADDR_UPDATE.into(),
        OperationOverride {
            period_secs: Some(ADDR_PERIOD),
            cancel_window: None,
        },
    );
    config
}

pub struct Fixture {
    pub engine: SecureOperationEngine,
    pub clock: ManualClock,
    pub events: MemoryEventSink,
    pub dispatcher: RecordingDispatcher,
    pub owner: SigningIdentity,
    pub requester: SigningIdentity,
    pub approver: SigningIdentity,
    pub canceller: SigningIdentity,
    pub signer: SigningIdentity,
    pub relayer: SigningIdentity,
    pub outsider: SigningIdentity,
    pub op: OperationTypeId,
    pub request_handler: Selector,
    pub meta_handler: Selector,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut EngineConfig)) -> Self {
        let mut config = base_config();
        adjust(&mut config);

        let clock = ManualClock::new(T0);
        let events = MemoryEventSink::new();
        let dispatcher = RecordingDispatcher::new();
        let mut engine = SecureOperationEngine::new(
            &config,
            Collaborators::new(clock.clone(), events.clone(), dispatcher.clone()),
        )
        .unwrap();

        let op = engine
            .register_named_operation_type(ADDR_UPDATE, WorkflowPath::standard_set())
            .unwrap();
        let request_handler = engine
            .register_function(
                FunctionSchema::new(
                    REQUEST_HANDLER,
                    op,
                    [
                        Action::TimeDelayRequest,
                        Action::TimeDelayApprove,
                        Action::TimeDelayCancel,
                    ],
                )
                .with_param("newAddress", "address"),
            )
            .unwrap();
        let meta_handler = engine
            .register_function(
                FunctionSchema::new(
                    META_HANDLER,
                    op,
                    [
                        Action::SignMetaRequestAndApprove,
                        Action::SignMetaApprove,
                        Action::SignMetaCancel,
                        Action::ExecuteMetaRequestAndApprove,
                        Action::ExecuteMetaApprove,
                        Action::ExecuteMetaCancel,
                    ],
                )
                .with_param("newAddress", "address"),
            )
            .unwrap();

        let (requester, approver, canceller, signer, relayer) =
            (key(2), key(3), key(4), key(5), key(6));
        let duties: [(&str, &SigningIdentity, Selector, &[Action]); 5] = [
            ("OPERATOR", &requester, request_handler, &[Action::TimeDelayRequest]),
            ("APPROVER", &approver, request_handler, &[Action::TimeDelayApprove]),
            ("CANCELLER", &canceller, request_handler, &[Action::TimeDelayCancel]),
            (
                "SIGNER",
                &signer,
                meta_handler,
                &[
                    Action::SignMetaRequestAndApprove,
                    Action::SignMetaApprove,
                    Action::SignMetaCancel,
                ],
            ),
            (
                "RELAYER",
                &relayer,
                meta_handler,
                &[
                    Action::ExecuteMetaRequestAndApprove,
                    Action::ExecuteMetaApprove,
                    Action::ExecuteMetaCancel,
                ],
            ),
        ];
        for (name, member, selector, actions) in duties {
            let role = engine.define_role(name, 4, false).unwrap();
            engine.add_member(role, member.identity()).unwrap();
            engine.grant(role, selector, actions).unwrap();
        }

        Self {
            engine,
            clock,
            events,
            dispatcher,
            owner: key(1),
            requester,
            approver,
            canceller,
            signer,
            relayer,
            outsider: key(7),
            op,
            request_handler,
            meta_handler,
        }
    }

    /// A standard call to [`target`] requested by `requester`.
    pub fn params_for(&self, requester: Identity) -> TxParams {
        TxParams {
            requester,
            target: target(),
            value: 0,
            gas_limit: 80_000,
            operation_type: self.op,
            execution: Execution::Standard {
                selector: Selector::from_signature(SET_ADDRESS),
                params: vec![0xab; 32],
            },
        }
    }

    pub fn params(&self) -> TxParams {
        self.params_for(self.requester.identity())
    }

    pub fn request(&mut self) -> TxId {
        let params = self.params();
        self.engine.create(self.request_handler, params).unwrap()
    }

    pub fn relay(&self) -> RelayContext {
        RelayContext::new(self.relayer.identity())
    }

    /// Signed approve or cancel of an existing record.
    pub fn sign_existing(&self, id: TxId, action: Action, signer: &SigningIdentity) -> SignedMetaTx {
        let deadline = self.engine.now() + VALIDITY;
        let params =
            self.engine
                .meta_tx_params(self.meta_handler, action, deadline, 0, signer.identity());
        let unsigned = self.engine.prepare_meta_tx(id, params).unwrap();
        let signature = signer.sign_digest(&unsigned.digest);
        unsigned.into_signed(signature)
    }

    /// Signed request-and-approve of `tx_params`.
    pub fn sign_request(&self, tx_params: TxParams, signer: &SigningIdentity) -> SignedMetaTx {
        let params = self.engine.meta_tx_params(
            self.meta_handler,
            Action::SignMetaRequestAndApprove,
            self.engine.now() + VALIDITY,
            0,
            signer.identity(),
        );
        let unsigned = self.engine.prepare_request_meta_tx(tx_params, params).unwrap();
        let signature = signer.sign_digest(&unsigned.digest);
        unsigned.into_signed(signature)
    }

    /// Sign arbitrary params without going through the engine helpers.
    pub fn sign_raw(
        &self,
        snapshot: RecordSnapshot,
        params: bastion_types::MetaTxParams,
        signer: &SigningIdentity,
    ) -> SignedMetaTx {
        let digest = bastion_engine::metatx::build_digest(&snapshot, &params);
        let encoded_call_data =
            bastion_engine::metatx::encode_call_data(params.handler_selector, &digest);
        SignedMetaTx {
            snapshot,
            params,
            digest,
            signature: signer.sign_digest(&digest),
            encoded_call_data,
        }
    }
}
