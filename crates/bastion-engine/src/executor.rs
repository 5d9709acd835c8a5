use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use bastion_types::{Execution, Identity, PaymentDetails, Selector, TxId, TxRecord, TxStatus};
use thiserror::Error;
use tracing::{info, warn};

/// Failure reported by a dispatch target. Never escapes the executor; it is
/// recorded as the FAILED record's result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("call reverted: {0}")]
    Reverted(String),

    #[error("target unreachable: {0}")]
    Unreachable(Identity),

    #[error("payment failed: {0}")]
    PaymentFailed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallPayload {
    Standard { selector: Selector, params: Vec<u8> },
    Raw(Vec<u8>),
}

/// One call an approved record dispatches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchCall {
    pub tx_id: TxId,
    pub target: Identity,
    pub value: u128,
    pub gas_limit: u64,
    pub payload: CallPayload,
}

impl DispatchCall {
    /// `None` for records whose execution is [`Execution::None`].
    pub fn from_record(record: &TxRecord) -> Option<Self> {
        let payload = match &record.params.execution {
            Execution::None => return None,
            Execution::Standard { selector, params } => CallPayload::Standard {
                selector: *selector,
                params: params.clone(),
            },
            Execution::Raw { payload } => CallPayload::Raw(payload.clone()),
        };
        Some(Self {
            tx_id: record.id,
            target: record.params.target,
            value: record.params.value,
            gas_limit: record.params.gas_limit,
            payload,
        })
    }
}

/// External effects of approved operations.
pub trait TargetDispatcher: Send + Sync {
    /// Perform the call and return its result bytes.
    fn dispatch(&self, call: &DispatchCall) -> Result<Vec<u8>, DispatchError>;

    /// Release a payment attached to `tx_id`.
    fn pay(&self, tx_id: TxId, payment: &PaymentDetails) -> Result<(), DispatchError>;
}

/// Terminal status and result bytes of one execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub status: TxStatus,
    pub result: Vec<u8>,
    pub error: Option<DispatchError>,
}

impl ExecutionOutcome {
    fn completed(result: Vec<u8>) -> Self {
        Self {
            status: TxStatus::Completed,
            result,
            error: None,
        }
    }

    fn failed(error: DispatchError) -> Self {
        Self {
            status: TxStatus::Failed,
            result: error.to_string().into_bytes(),
            error: Some(error),
        }
    }
}

/// Dispatches approved records and turns the outcome into a terminal status.
pub struct OperationExecutor {
    dispatcher: Box<dyn TargetDispatcher>,
    engine_identity: Identity,
}

impl OperationExecutor {
    pub fn new(dispatcher: Box<dyn TargetDispatcher>, engine_identity: Identity) -> Self {
        Self {
            dispatcher,
            engine_identity,
        }
    }

    /// Execute `record`.
    ///
    /// Calls targeting the engine's own identity go to `internal` instead of
    /// the dispatcher. An attached payment is released only after the main
    /// call succeeds.
    pub fn execute(
        &self,
        record: &TxRecord,
        internal: &mut dyn FnMut(&DispatchCall) -> Result<Vec<u8>, DispatchError>,
    ) -> ExecutionOutcome {
        let main = match DispatchCall::from_record(record) {
            None => Ok(Vec::new()),
            Some(call) if call.target == self.engine_identity => internal(&call),
            Some(call) => self.dispatcher.dispatch(&call),
        };

        let result = match main {
            Ok(result) => result,
            Err(err) => {
                warn!(tx_id = %record.id, error = %err, "Execution failed");
                return ExecutionOutcome::failed(err);
            }
        };

        if let Some(payment) = record.payment.as_ref().filter(|p| !p.is_empty()) {
            if let Err(err) = self.dispatcher.pay(record.id, payment) {
                warn!(tx_id = %record.id, error = %err, "Payment failed");
                return ExecutionOutcome::failed(err);
            }
        }

        info!(
            tx_id = %record.id,
            execution = ?record.execution_type(),
            result_len = result.len(),
            "Execution completed"
        );
        ExecutionOutcome::completed(result)
    }
}

impl std::fmt::Debug for OperationExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationExecutor")
            .field("engine_identity", &self.engine_identity)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    calls: Vec<DispatchCall>,
    payments: Vec<(TxId, PaymentDetails)>,
    results: HashMap<Identity, Vec<u8>>,
    failing_targets: HashMap<Identity, String>,
    fail_payments: bool,
}

/// In-memory dispatcher that records every call.
///
/// Clones share state, so a test can keep one handle and give the other to
/// the engine.
#[derive(Clone, Debug, Default)]
pub struct RecordingDispatcher {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return `result` from every call to `target`.
    pub fn respond(&self, target: Identity, result: Vec<u8>) {
        self.state().results.insert(target, result);
    }

    /// Make every call to `target` revert with `reason`.
    pub fn fail_target(&self, target: Identity, reason: impl Into<String>) {
        self.state().failing_targets.insert(target, reason.into());
    }

    pub fn fail_payments(&self, fail: bool) {
        self.state().fail_payments = fail;
    }

    pub fn calls(&self) -> Vec<DispatchCall> {
        self.state().calls.clone()
    }

    pub fn payments(&self) -> Vec<(TxId, PaymentDetails)> {
        self.state().payments.clone()
    }
}

impl TargetDispatcher for RecordingDispatcher {
    fn dispatch(&self, call: &DispatchCall) -> Result<Vec<u8>, DispatchError> {
        let mut state = self.state();
        state.calls.push(call.clone());
        if let Some(reason) = state.failing_targets.get(&call.target) {
            return Err(DispatchError::Reverted(reason.clone()));
        }
        Ok(state.results.get(&call.target).cloned().unwrap_or_default())
    }

    fn pay(&self, tx_id: TxId, payment: &PaymentDetails) -> Result<(), DispatchError> {
        let mut state = self.state();
        if state.fail_payments {
            return Err(DispatchError::PaymentFailed(format!(
                "{} to {}",
                payment.native_amount, payment.recipient
            )));
        }
        state.payments.push((tx_id, payment.clone()));
        Ok(())
    }
}
