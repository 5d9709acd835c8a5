use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::ids::{Digest, Identity, OperationTypeId, Selector, TxId};

/// Status of a transaction record.
///
/// A record that does not exist is UNDEFINED; it is not represented here.
/// `Completed`, `Cancelled` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TxStatus::Pending => "PENDING",
            TxStatus::Completed => "COMPLETED",
            TxStatus::Cancelled => "CANCELLED",
            TxStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Discriminant of [`Execution`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionType {
    None,
    Standard,
    Raw,
}

impl ExecutionType {
    pub fn ordinal(&self) -> u8 {
        match self {
            ExecutionType::None => 0,
            ExecutionType::Standard => 1,
            ExecutionType::Raw => 2,
        }
    }
}

/// The effect an approved operation dispatches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Execution {
    /// Internal bookkeeping applied by the collaborator; nothing is dispatched.
    None,
    /// Call `selector` on the target with encoded `params`.
    Standard { selector: Selector, params: Vec<u8> },
    /// Pass an opaque call payload to the target.
    Raw { payload: Vec<u8> },
}

impl Execution {
    pub fn kind(&self) -> ExecutionType {
        match self {
            Execution::None => ExecutionType::None,
            Execution::Standard { .. } => ExecutionType::Standard,
            Execution::Raw { .. } => ExecutionType::Raw,
        }
    }
}

/// Optional payment released after the main execution succeeds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub recipient: Identity,
    pub native_amount: u128,
    /// Token contract; `None` when only a native amount is paid.
    pub token: Option<Identity>,
    pub token_amount: u128,
}

impl PaymentDetails {
    pub fn is_empty(&self) -> bool {
        self.native_amount == 0 && self.token_amount == 0
    }
}

/// The caller-supplied part of a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxParams {
    pub requester: Identity,
    pub target: Identity,
    pub value: u128,
    pub gas_limit: u64,
    pub operation_type: OperationTypeId,
    pub execution: Execution,
}

impl TxParams {
    pub fn execution_type(&self) -> ExecutionType {
        self.execution.kind()
    }
}

/// A transaction record. Never deleted; terminal records are frozen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub id: TxId,
    pub params: TxParams,
    pub status: TxStatus,
    /// Declared function through which the record was requested.
    pub handler_selector: Selector,
    pub created_at: u64,
    pub release_time: u64,
    /// Digest of the meta-transaction that finalized the record, if any.
    pub message: Option<Digest>,
    pub result: Vec<u8>,
    pub payment: Option<PaymentDetails>,
    /// Lifecycle actions applied so far, in order.
    pub history: Vec<Action>,
}

impl TxRecord {
    pub fn is_pending(&self) -> bool {
        self.status == TxStatus::Pending
    }

    pub fn operation_type(&self) -> OperationTypeId {
        self.params.operation_type
    }

    pub fn execution_type(&self) -> ExecutionType {
        self.params.execution_type()
    }
}
