//! The secure operation engine aggregate.
//!
//! [`SecureOperationEngine`] owns every component and exposes the lifecycle
//! entry points. Each mutating method validates everything first and only
//! then touches state, so a returned error never leaves a partial effect.

use std::collections::{BTreeMap, BTreeSet};

use bastion_types::{
    Action, Digest, Execution, Identity, LifecycleEvent, LifecycleEventKind, MetaTxParams,
    OperationTypeId, PaymentDetails, RecordSnapshot, RoleHash, Selector, SignedMetaTx, TxId,
    TxParams, TxRecord, TxStatus, UnsignedMetaTx,
};
use tracing::{info, warn};

use crate::catalog::{OperationCatalog, OperationTypeEntry, WorkflowPath};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::EventSink;
use crate::executor::{
    CallPayload, DispatchCall, DispatchError, OperationExecutor, TargetDispatcher,
};
use crate::ledger::{StatusCounts, TransactionLedger};
use crate::metatx::{MetaTransactionVerifier, RelayContext};
use crate::permissions::{FunctionSchema, PermissionRegistry, Role};
use crate::timelock::{CancelWindow, TimeLockPolicy};

/// Operation type through which time-lock periods are changed.
pub const TIMELOCK_UPDATE: &str = "TIMELOCK_UPDATE";
/// Handler for time-delay requests of [`TIMELOCK_UPDATE`].
pub const TIMELOCK_UPDATE_REQUEST: &str = "updateTimeLockRequest(bytes32,uint64)";
/// Handler for meta-transactions of [`TIMELOCK_UPDATE`].
pub const TIMELOCK_UPDATE_META: &str = "updateTimeLockWithMetaTx(bytes32,uint64)";
/// Engine-internal call applied when a [`TIMELOCK_UPDATE`] completes.
pub const SET_TIMELOCK_PERIOD: &str = "setTimeLockPeriod(bytes32,uint64)";

const TIME_DELAY_ACTIONS: [Action; 3] = [
    Action::TimeDelayRequest,
    Action::TimeDelayApprove,
    Action::TimeDelayCancel,
];

const META_ACTIONS: [Action; 6] = [
    Action::SignMetaRequestAndApprove,
    Action::SignMetaApprove,
    Action::SignMetaCancel,
    Action::ExecuteMetaRequestAndApprove,
    Action::ExecuteMetaApprove,
    Action::ExecuteMetaCancel,
];

/// Call parameters of [`SET_TIMELOCK_PERIOD`]: operation type then period
/// (little-endian seconds).
pub fn encode_timelock_update(operation_type: OperationTypeId, period_secs: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(40);
    out.extend_from_slice(operation_type.as_bytes());
    out.extend_from_slice(&period_secs.to_le_bytes());
    out
}

fn decode_timelock_update(params: &[u8]) -> Option<(OperationTypeId, u64)> {
    if params.len() != 40 {
        return None;
    }
    let id: [u8; 32] = params[..32].try_into().ok()?;
    let period: [u8; 8] = params[32..].try_into().ok()?;
    Some((OperationTypeId::from_bytes(id), u64::from_le_bytes(period)))
}

/// The injected collaborators of an engine.
pub struct Collaborators {
    pub clock: Box<dyn Clock>,
    pub events: Box<dyn EventSink>,
    pub dispatcher: Box<dyn TargetDispatcher>,
}

impl Collaborators {
    pub fn new(
        clock: impl Clock + 'static,
        events: impl EventSink + 'static,
        dispatcher: impl TargetDispatcher + 'static,
    ) -> Self {
        Self {
            clock: Box::new(clock),
            events: Box::new(events),
            dispatcher: Box::new(dispatcher),
        }
    }
}

/// Secure multi-phase operation engine.
pub struct SecureOperationEngine {
    identity: Identity,
    permissions: PermissionRegistry,
    catalog: OperationCatalog,
    timelock: TimeLockPolicy,
    verifier: MetaTransactionVerifier,
    ledger: TransactionLedger,
    executor: OperationExecutor,
    clock: Box<dyn Clock>,
    events: Box<dyn EventSink>,
    owner_role: RoleHash,
    timelock_update: OperationTypeId,
}

impl SecureOperationEngine {
    /// Build an engine and run the bootstrap: `OWNER_ROLE` (seeded with the
    /// configured owner) and the self-governed [`TIMELOCK_UPDATE`] operation.
    pub fn new(config: &EngineConfig, collaborators: Collaborators) -> EngineResult<Self> {
        config
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        let identity = config
            .engine_identity()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        let owner = config
            .owner_identity()
            .map_err(|e| EngineError::Config(e.to_string()))?;

        let mut timelock = TimeLockPolicy::new(config.timelock.default_period_secs)?;
        for (name, over) in &config.timelock.overrides {
            let id = OperationTypeId::from_name(name);
            if let Some(period) = over.period_secs {
                timelock.set_period(id, period)?;
            }
            if let Some(window) = over.cancel_window {
                timelock.set_cancel_window(id, window);
            }
        }

        let mut engine = Self {
            identity,
            permissions: PermissionRegistry::new(),
            catalog: OperationCatalog::new(),
            timelock,
            verifier: MetaTransactionVerifier::new(config.chain_id, identity),
            ledger: TransactionLedger::new(),
            executor: OperationExecutor::new(collaborators.dispatcher, identity),
            clock: collaborators.clock,
            events: collaborators.events,
            owner_role: RoleHash::owner(),
            timelock_update: OperationTypeId::from_name(TIMELOCK_UPDATE),
        };
        engine.bootstrap(owner)?;
        info!(
            identity = %identity,
            chain_id = config.chain_id,
            default_period = config.timelock.default_period_secs,
            "Secure operation engine started"
        );
        Ok(engine)
    }

    fn bootstrap(&mut self, owner: Option<Identity>) -> EngineResult<()> {
        self.owner_role = self
            .permissions
            .define_role(RoleHash::OWNER_ROLE_NAME, 1, true)?;
        if let Some(owner) = owner {
            self.permissions.add_member(self.owner_role, owner)?;
        }

        self.timelock_update = self
            .catalog
            .register_named(TIMELOCK_UPDATE, WorkflowPath::standard_set())?;
        let request = self.permissions.register_function(
            FunctionSchema::new(TIMELOCK_UPDATE_REQUEST, self.timelock_update, TIME_DELAY_ACTIONS)
                .with_param("operationType", "bytes32")
                .with_param("periodSecs", "uint64"),
        )?;
        let meta = self.permissions.register_function(
            FunctionSchema::new(TIMELOCK_UPDATE_META, self.timelock_update, META_ACTIONS)
                .with_param("operationType", "bytes32")
                .with_param("periodSecs", "uint64"),
        )?;
        self.permissions
            .grant(self.owner_role, request, &TIME_DELAY_ACTIONS)?;
        self.permissions.grant(self.owner_role, meta, &META_ACTIONS)?;
        Ok(())
    }

    // ── registration ────────────────────────────────────────────────

    /// Define a role; see [`PermissionRegistry::define_role`].
    pub fn define_role(
        &mut self,
        name: &str,
        max_members: usize,
        protected: bool,
    ) -> EngineResult<RoleHash> {
        self.permissions.define_role(name, max_members, protected)
    }

    /// Add `identity` to `role`, up to its member limit.
    pub fn add_member(&mut self, role: RoleHash, identity: Identity) -> EngineResult<()> {
        self.permissions.add_member(role, identity)
    }

    /// Remove `identity` from an unprotected role.
    pub fn remove_member(&mut self, role: RoleHash, identity: Identity) -> EngineResult<()> {
        self.permissions.remove_member(role, identity)
    }

    /// Swap one member of `role` for another; works on `OWNER_ROLE` too.
    pub fn replace_member(
        &mut self,
        role: RoleHash,
        old: Identity,
        new: Identity,
    ) -> EngineResult<()> {
        self.permissions.replace_member(role, old, new)
    }

    /// Register an operation type under an explicit identifier.
    pub fn register_operation_type(
        &mut self,
        id: OperationTypeId,
        name: &str,
        paths: Vec<WorkflowPath>,
    ) -> EngineResult<OperationTypeId> {
        self.catalog.register(id, name, paths)
    }

    /// Register under the identifier derived from `name`.
    pub fn register_named_operation_type(
        &mut self,
        name: &str,
        paths: Vec<WorkflowPath>,
    ) -> EngineResult<OperationTypeId> {
        self.catalog.register_named(name, paths)
    }

    /// Declare a function; its operation type must already be registered.
    pub fn register_function(&mut self, schema: FunctionSchema) -> EngineResult<Selector> {
        self.catalog.lookup(schema.operation_type)?;
        self.permissions.register_function(schema)
    }

    /// Grant `actions` on `selector` to every member of `role`.
    pub fn grant(
        &mut self,
        role: RoleHash,
        selector: Selector,
        actions: &[Action],
    ) -> EngineResult<()> {
        self.permissions.grant(role, selector, actions)
    }

    /// Revoke `actions`; the next permission check already sees it.
    pub fn revoke(
        &mut self,
        role: RoleHash,
        selector: Selector,
        actions: &[Action],
    ) -> EngineResult<()> {
        self.permissions.revoke(role, selector, actions)
    }

    /// Change when time-delay cancellation is allowed for `operation_type`.
    pub fn set_cancel_window(&mut self, operation_type: OperationTypeId, window: CancelWindow) {
        self.timelock.set_cancel_window(operation_type, window);
    }

    // ── time-delay track ────────────────────────────────────────────

    /// Open a PENDING record through `handler`.
    ///
    /// `handler` must be a declared function of the record's operation type
    /// and the requester must be granted `TimeDelayRequest` on it.
    pub fn create(&mut self, handler: Selector, params: TxParams) -> EngineResult<TxId> {
        let op = params.operation_type;
        self.catalog
            .lookup(op)
            .map_err(|_| EngineError::InvalidOperationType(op))?;
        self.require_handler(handler, op, &[Action::TimeDelayRequest])?;
        self.require_workflow(op, &[], &[Action::TimeDelayRequest])?;
        self.validate_execution(&params)?;
        self.require_permission(&params.requester, handler, Action::TimeDelayRequest)?;

        let now = self.now();
        let release_time = self.timelock.release_time_for(op, now)?;
        let requester = params.requester;
        let id = self
            .ledger
            .insert_pending(params, handler, now, release_time, Action::TimeDelayRequest)?;

        info!(
            tx_id = %id,
            operation_type = %op,
            requester = %requester,
            release_time,
            "Operation requested"
        );
        self.emit(
            id,
            op,
            LifecycleEventKind::Requested {
                requester,
                release_time,
            },
        );
        Ok(id)
    }

    /// Attach a payment released after a successful execution.
    pub fn attach_payment(
        &mut self,
        id: TxId,
        caller: Identity,
        payment: PaymentDetails,
    ) -> EngineResult<()> {
        let record = self.ledger.pending(id)?;
        if record.params.requester != caller {
            return Err(EngineError::NotRequester { tx_id: id, caller });
        }
        self.validate_payment_target(&record.params)?;
        Self::validate_payment(&payment)?;
        self.ledger.attach_payment(id, payment)
    }

    pub fn approve_by_timelock(&mut self, id: TxId, caller: Identity) -> EngineResult<TxRecord> {
        let now = self.now();
        let record = self.ledger.pending(id)?;
        let op = record.operation_type();
        self.require_permission(&caller, record.handler_selector, Action::TimeDelayApprove)?;
        self.require_workflow(op, &record.history, &[Action::TimeDelayApprove])?;
        self.timelock.check_released(id, record.release_time, now)?;

        self.ledger.record_actions(id, &[Action::TimeDelayApprove])?;
        self.emit(
            id,
            op,
            LifecycleEventKind::Approved {
                by: caller,
                action: Action::TimeDelayApprove,
            },
        );
        self.execute(id, None)
    }

    /// Cancel a PENDING record. Before release this depends on the operation
    /// type's [`CancelWindow`].
    pub fn cancel_by_timelock(&mut self, id: TxId, caller: Identity) -> EngineResult<TxRecord> {
        let now = self.now();
        let record = self.ledger.pending(id)?;
        let op = record.operation_type();
        self.require_permission(&caller, record.handler_selector, Action::TimeDelayCancel)?;
        self.require_workflow(op, &record.history, &[Action::TimeDelayCancel])?;
        self.timelock
            .check_cancellable(id, op, record.release_time, now)?;

        self.ledger.record_actions(id, &[Action::TimeDelayCancel])?;
        self.cancel(id, op, caller, Action::TimeDelayCancel, None)
    }

    // ── meta-transaction track ──────────────────────────────────────

    /// Params for `signer` bound to this engine and the signer's current
    /// nonce.
    pub fn meta_tx_params(
        &self,
        handler: Selector,
        action: Action,
        deadline: u64,
        max_gas_price: u128,
        signer: Identity,
    ) -> MetaTxParams {
        self.verifier
            .params(handler, action, deadline, max_gas_price, signer)
    }

    /// Unsigned payload approving or cancelling an existing PENDING record.
    pub fn prepare_meta_tx(&self, id: TxId, params: MetaTxParams) -> EngineResult<UnsignedMetaTx> {
        let record = self.ledger.pending(id)?;
        if !matches!(params.action, Action::SignMetaApprove | Action::SignMetaCancel) {
            return Err(EngineError::ActionMismatch {
                expected: Action::SignMetaApprove,
                got: params.action,
            });
        }
        self.require_handler(
            params.handler_selector,
            record.operation_type(),
            &Self::meta_pair(params.action)?,
        )?;
        Ok(self.verifier.prepare(RecordSnapshot::from(record), params))
    }

    /// Unsigned request-and-approve payload for a record that does not
    /// exist yet.
    pub fn prepare_request_meta_tx(
        &self,
        tx_params: TxParams,
        params: MetaTxParams,
    ) -> EngineResult<UnsignedMetaTx> {
        if params.action != Action::SignMetaRequestAndApprove {
            return Err(EngineError::ActionMismatch {
                expected: Action::SignMetaRequestAndApprove,
                got: params.action,
            });
        }
        let op = tx_params.operation_type;
        self.catalog
            .lookup(op)
            .map_err(|_| EngineError::InvalidOperationType(op))?;
        self.require_handler(params.handler_selector, op, &Self::meta_pair(params.action)?)?;
        self.validate_execution(&tx_params)?;
        Ok(self
            .verifier
            .prepare(RecordSnapshot::new_request(tx_params), params))
    }

    /// Approve a PENDING record without waiting for its release time.
    pub fn approve_by_meta_tx(
        &mut self,
        tx: &SignedMetaTx,
        relay: RelayContext,
    ) -> EngineResult<TxRecord> {
        let id = tx.snapshot.tx_id;
        let op = self.check_existing_meta(tx, relay, Action::SignMetaApprove)?;

        self.verifier.consume(tx)?;
        self.ledger
            .record_actions(id, &[Action::SignMetaApprove, Action::ExecuteMetaApprove])?;
        self.emit(
            id,
            op,
            LifecycleEventKind::Approved {
                by: tx.params.signer,
                action: Action::SignMetaApprove,
            },
        );
        self.execute(id, Some(tx.digest))
    }

    pub fn cancel_by_meta_tx(
        &mut self,
        tx: &SignedMetaTx,
        relay: RelayContext,
    ) -> EngineResult<TxRecord> {
        let id = tx.snapshot.tx_id;
        let op = self.check_existing_meta(tx, relay, Action::SignMetaCancel)?;

        self.verifier.consume(tx)?;
        self.ledger
            .record_actions(id, &[Action::SignMetaCancel, Action::ExecuteMetaCancel])?;
        self.cancel(id, op, tx.params.signer, Action::SignMetaCancel, Some(tx))
    }

    /// Create and approve in one call. Still allocates an id; the record
    /// goes straight from UNDEFINED to COMPLETED or FAILED.
    pub fn request_and_approve_by_meta_tx(
        &mut self,
        tx: &SignedMetaTx,
        relay: RelayContext,
    ) -> EngineResult<TxRecord> {
        let params = &tx.params;
        if params.action != Action::SignMetaRequestAndApprove {
            return Err(EngineError::ActionMismatch {
                expected: Action::SignMetaRequestAndApprove,
                got: params.action,
            });
        }
        if tx.snapshot.tx_id.is_allocated() {
            return Err(EngineError::SnapshotMismatch(tx.snapshot.tx_id));
        }
        let tx_params = &tx.snapshot.params;
        if tx_params.requester != params.signer {
            return Err(EngineError::RequesterMismatch {
                requester: tx_params.requester,
                signer: params.signer,
            });
        }
        let op = tx_params.operation_type;
        self.catalog
            .lookup(op)
            .map_err(|_| EngineError::InvalidOperationType(op))?;
        let pair = Self::meta_pair(params.action)?;
        self.require_handler(params.handler_selector, op, &pair)?;
        self.require_workflow(op, &[], &pair)?;
        self.validate_execution(tx_params)?;
        if let Some(payment) = &tx.snapshot.payment {
            self.validate_payment_target(tx_params)?;
            Self::validate_payment(payment)?;
        }

        let now = self.now();
        self.verifier.check(tx, now, relay.gas_price)?;
        self.require_permission(&params.signer, params.handler_selector, pair[0])?;
        self.require_permission(&relay.relayer, params.handler_selector, pair[1])?;
        let release_time = self.timelock.release_time_for(op, now)?;

        self.verifier.consume(tx)?;
        let id = self.ledger.insert_pending(
            tx_params.clone(),
            params.handler_selector,
            now,
            release_time,
            Action::SignMetaRequestAndApprove,
        )?;
        if let Some(payment) = &tx.snapshot.payment {
            self.ledger.attach_payment(id, payment.clone())?;
        }
        self.ledger
            .record_actions(id, &[Action::ExecuteMetaRequestAndApprove])?;

        info!(
            tx_id = %id,
            operation_type = %op,
            signer = %params.signer,
            relayer = %relay.relayer,
            "Operation requested and approved"
        );
        self.emit(
            id,
            op,
            LifecycleEventKind::Requested {
                requester: tx_params.requester,
                release_time,
            },
        );
        self.emit(
            id,
            op,
            LifecycleEventKind::Approved {
                by: params.signer,
                action: Action::SignMetaRequestAndApprove,
            },
        );
        self.execute(id, Some(tx.digest))
    }

    // ── built-in time-lock update ───────────────────────────────────

    /// Record parameters for a [`TIMELOCK_UPDATE`] of `operation_type`.
    pub fn timelock_update_params(
        &self,
        requester: Identity,
        operation_type: OperationTypeId,
        period_secs: u64,
    ) -> TxParams {
        TxParams {
            requester,
            target: self.identity,
            value: 0,
            gas_limit: 0,
            operation_type: self.timelock_update,
            execution: Execution::Standard {
                selector: Selector::from_signature(SET_TIMELOCK_PERIOD),
                params: encode_timelock_update(operation_type, period_secs),
            },
        }
    }

    /// Request a time-lock change over the time-delay track.
    pub fn request_timelock_update(
        &mut self,
        caller: Identity,
        operation_type: OperationTypeId,
        period_secs: u64,
    ) -> EngineResult<TxId> {
        let params = self.timelock_update_params(caller, operation_type, period_secs);
        self.create(Selector::from_signature(TIMELOCK_UPDATE_REQUEST), params)
    }

    // ── read surface ────────────────────────────────────────────────

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn chain_id(&self) -> u64 {
        self.verifier.chain_id()
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn owner_role(&self) -> RoleHash {
        self.owner_role
    }

    /// Current member of `OWNER_ROLE`, if any.
    pub fn owner(&self) -> Option<Identity> {
        self.permissions
            .role(self.owner_role)
            .ok()
            .and_then(|r| r.members.iter().next().copied())
    }

    pub fn get_transaction(&self, id: TxId) -> EngineResult<&TxRecord> {
        self.ledger.get(id)
    }

    pub fn list_pending(&self) -> Vec<TxId> {
        self.ledger.pending_ids()
    }

    pub fn transactions(&self) -> impl Iterator<Item = &TxRecord> {
        self.ledger.records()
    }

    pub fn status_counts(&self) -> StatusCounts {
        self.ledger.counts()
    }

    pub fn nonce(&self, signer: &Identity) -> u64 {
        self.verifier.nonce(signer)
    }

    pub fn check_permission(
        &self,
        identity: &Identity,
        selector: Selector,
        action: Action,
    ) -> bool {
        self.permissions.check(identity, selector, action)
    }

    pub fn role(&self, role: RoleHash) -> EngineResult<&Role> {
        self.permissions.role(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.permissions.roles()
    }

    pub fn roles_of(&self, identity: &Identity) -> Vec<RoleHash> {
        self.permissions.roles_of(identity)
    }

    pub fn function(&self, selector: Selector) -> EngineResult<&FunctionSchema> {
        self.permissions.function(selector)
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionSchema> {
        self.permissions.functions()
    }

    pub fn permissions_of(&self, role: RoleHash) -> BTreeMap<Selector, BTreeSet<Action>> {
        self.permissions.permissions_of(role)
    }

    pub fn operation_type(&self, id: OperationTypeId) -> EngineResult<&OperationTypeEntry> {
        self.catalog.lookup(id)
    }

    pub fn operation_types(&self) -> impl Iterator<Item = &OperationTypeEntry> {
        self.catalog.entries()
    }

    pub fn timelock_period(&self, operation_type: OperationTypeId) -> u64 {
        self.timelock.period_for(operation_type)
    }

    pub fn cancel_window(&self, operation_type: OperationTypeId) -> CancelWindow {
        self.timelock.cancel_window(operation_type)
    }

    // ── internals ───────────────────────────────────────────────────

    /// Every check of an approve/cancel meta-transaction, without mutation.
    fn check_existing_meta(
        &self,
        tx: &SignedMetaTx,
        relay: RelayContext,
        expected: Action,
    ) -> EngineResult<OperationTypeId> {
        let params = &tx.params;
        if params.action != expected {
            return Err(EngineError::ActionMismatch {
                expected,
                got: params.action,
            });
        }
        // Replays are reported as such even once the record is terminal.
        self.verifier.check(tx, self.now(), relay.gas_price)?;

        let id = tx.snapshot.tx_id;
        let record = self.ledger.pending(id)?;
        if RecordSnapshot::from(record) != tx.snapshot {
            return Err(EngineError::SnapshotMismatch(id));
        }
        let op = record.operation_type();
        let pair = Self::meta_pair(expected)?;
        self.require_handler(params.handler_selector, op, &pair)?;
        self.require_workflow(op, &record.history, &pair)?;
        self.require_permission(&params.signer, params.handler_selector, pair[0])?;
        self.require_permission(&relay.relayer, params.handler_selector, pair[1])?;
        Ok(op)
    }

    /// A signing action and its relayer counterpart.
    fn meta_pair(sign: Action) -> EngineResult<[Action; 2]> {
        sign.execute_counterpart()
            .map(|execute| [sign, execute])
            .ok_or(EngineError::ActionMismatch {
                expected: Action::SignMetaApprove,
                got: sign,
            })
    }

    fn require_handler(
        &self,
        handler: Selector,
        operation_type: OperationTypeId,
        actions: &[Action],
    ) -> EngineResult<()> {
        let schema = self.permissions.function(handler)?;
        if schema.operation_type != operation_type {
            return Err(EngineError::HandlerMismatch {
                selector: handler,
                declared: schema.operation_type,
                requested: operation_type,
            });
        }
        if let Some(action) = actions.iter().find(|a| !schema.supports(**a)) {
            return Err(EngineError::UnsupportedAction {
                selector: handler,
                action: *action,
            });
        }
        Ok(())
    }

    fn require_workflow(
        &self,
        operation_type: OperationTypeId,
        history: &[Action],
        next: &[Action],
    ) -> EngineResult<()> {
        let sequence: Vec<Action> = history.iter().chain(next).copied().collect();
        if !self.catalog.permits(operation_type, &sequence) {
            return Err(EngineError::WorkflowViolation {
                operation_type,
                action: next.first().copied().unwrap_or(Action::TimeDelayRequest),
            });
        }
        Ok(())
    }

    fn require_permission(
        &self,
        identity: &Identity,
        selector: Selector,
        action: Action,
    ) -> EngineResult<()> {
        if !self.permissions.check(identity, selector, action) {
            warn!(identity = %identity, selector = %selector, action = %action, "Unauthorized");
            return Err(EngineError::Unauthorized {
                identity: *identity,
                selector,
                action,
            });
        }
        Ok(())
    }

    fn validate_execution(&self, params: &TxParams) -> EngineResult<()> {
        let invalid = |reason: &str| Err(EngineError::InvalidExecutionPayload(reason.into()));
        let targets_engine = params.target == self.identity;
        let is_timelock_update = params.operation_type == self.timelock_update;
        if targets_engine != is_timelock_update {
            return invalid("only TIMELOCK_UPDATE may target the engine");
        }
        if targets_engine {
            if params.value != 0 {
                return invalid("engine calls carry no value");
            }
            let Execution::Standard { selector, params } = &params.execution else {
                return invalid("engine calls must be standard calls");
            };
            if *selector != Selector::from_signature(SET_TIMELOCK_PERIOD) {
                return invalid("unknown engine call");
            }
            return match decode_timelock_update(params) {
                Some((_, 0)) => invalid("time-lock period must be greater than zero"),
                Some(_) => Ok(()),
                None => invalid("malformed time-lock update parameters"),
            };
        }

        match &params.execution {
            Execution::None if params.value != 0 => invalid("value requires a dispatched call"),
            Execution::None => Ok(()),
            Execution::Standard { selector, .. } if selector.is_zero() => invalid("zero selector"),
            Execution::Raw { payload } if payload.is_empty() => invalid("empty raw payload"),
            Execution::Standard { .. } | Execution::Raw { .. } if params.target.is_zero() => {
                invalid("zero target")
            }
            Execution::Standard { .. } | Execution::Raw { .. } => Ok(()),
        }
    }

    /// Records that call the engine carry no payment.
    fn validate_payment_target(&self, params: &TxParams) -> EngineResult<()> {
        if params.target == self.identity {
            return Err(EngineError::InvalidPayment(
                "engine calls carry no payment".into(),
            ));
        }
        Ok(())
    }

    fn validate_payment(payment: &PaymentDetails) -> EngineResult<()> {
        if payment.recipient.is_zero() && !payment.is_empty() {
            return Err(EngineError::InvalidPayment("zero recipient".into()));
        }
        if payment.token.is_none() && payment.token_amount != 0 {
            return Err(EngineError::InvalidPayment(
                "token amount without token".into(),
            ));
        }
        Ok(())
    }

    /// Dispatch a PENDING record and finalize it.
    fn execute(&mut self, id: TxId, message: Option<Digest>) -> EngineResult<TxRecord> {
        let record = self.ledger.pending(id)?;
        let op = record.operation_type();
        let timelock = &mut self.timelock;
        let outcome = self
            .executor
            .execute(record, &mut |call: &DispatchCall| apply_engine_call(timelock, call));

        let finalized = self
            .ledger
            .finalize(id, outcome.status, outcome.result, message)?
            .clone();
        self.emit(
            id,
            op,
            LifecycleEventKind::Executed {
                status: finalized.status,
                result: finalized.result.clone(),
            },
        );
        Ok(finalized)
    }

    fn cancel(
        &mut self,
        id: TxId,
        op: OperationTypeId,
        by: Identity,
        action: Action,
        meta: Option<&SignedMetaTx>,
    ) -> EngineResult<TxRecord> {
        let finalized = self
            .ledger
            .finalize(id, TxStatus::Cancelled, Vec::new(), meta.map(|m| m.digest))?
            .clone();
        info!(tx_id = %id, by = %by, action = %action, "Operation cancelled");
        self.emit(id, op, LifecycleEventKind::Cancelled { by, action });
        Ok(finalized)
    }

    fn emit(&self, id: TxId, op: OperationTypeId, kind: LifecycleEventKind) {
        self.events
            .emit(&LifecycleEvent::new(id, op, self.now(), kind));
    }
}

/// Internal handler for calls that target the engine itself.
fn apply_engine_call(
    timelock: &mut TimeLockPolicy,
    call: &DispatchCall,
) -> Result<Vec<u8>, DispatchError> {
    let CallPayload::Standard { selector, params } = &call.payload else {
        return Err(DispatchError::Reverted("engine accepts standard calls only".into()));
    };
    if *selector != Selector::from_signature(SET_TIMELOCK_PERIOD) {
        return Err(DispatchError::Reverted(format!("unknown engine call {selector}")));
    }
    let (operation_type, period) = decode_timelock_update(params)
        .ok_or_else(|| DispatchError::Reverted("malformed time-lock update".into()))?;
    let previous = timelock
        .set_period(operation_type, period)
        .map_err(|e| DispatchError::Reverted(e.to_string()))?;
    Ok(previous.to_le_bytes().to_vec())
}

impl std::fmt::Debug for SecureOperationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureOperationEngine")
            .field("identity", &self.identity)
            .field("chain_id", &self.verifier.chain_id())
            .field("transactions", &self.ledger.len())
            .field("pending", &self.ledger.pending_ids().len())
            .finish_non_exhaustive()
    }
}
