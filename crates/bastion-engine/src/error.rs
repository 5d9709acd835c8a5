use bastion_crypto::CryptoError;
use bastion_types::{Action, Identity, OperationTypeId, RoleHash, Selector, TxId, TxStatus};
use thiserror::Error;

/// Errors from the secure operation engine.
///
/// Every error is raised before any state is mutated; see [`EngineError::kind`]
/// for the recovery class.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    // ── validation ──────────────────────────────────────────────────
    #[error("unknown operation type: {0}")]
    UnknownOperationType(OperationTypeId),

    #[error("invalid operation type: {0}")]
    InvalidOperationType(OperationTypeId),

    #[error("operation type already registered with different content: {0}")]
    OperationTypeAlreadyExists(String),

    #[error("invalid workflow: {0}")]
    InvalidWorkflow(String),

    #[error("action {action} is not on a declared workflow path of {operation_type}")]
    WorkflowViolation {
        operation_type: OperationTypeId,
        action: Action,
    },

    #[error("unknown function: {0}")]
    UnknownFunction(Selector),

    #[error("function already declared with different content: {0}")]
    FunctionAlreadyExists(Selector),

    #[error("function {selector} belongs to {declared}, not {requested}")]
    HandlerMismatch {
        selector: Selector,
        declared: OperationTypeId,
        requested: OperationTypeId,
    },

    #[error("function {selector} does not support action {action}")]
    UnsupportedAction { selector: Selector, action: Action },

    #[error("unknown role: {0}")]
    UnknownRole(RoleHash),

    #[error("protected role already exists: {0}")]
    RoleAlreadyExists(String),

    #[error("invalid role definition: {0}")]
    InvalidRoleDefinition(String),

    #[error("role {role} is full ({max_members} members)")]
    RoleFull { role: RoleHash, max_members: usize },

    #[error("{identity} is already a member of {role}")]
    AlreadyMember { role: RoleHash, identity: Identity },

    #[error("{identity} is not a member of {role}")]
    NotMember { role: RoleHash, identity: Identity },

    #[error("members cannot be removed from protected role {0}")]
    ProtectedRole(RoleHash),

    #[error("invalid execution payload: {0}")]
    InvalidExecutionPayload(String),

    #[error("invalid payment: {0}")]
    InvalidPayment(String),

    #[error("invalid time-lock period: {0}s")]
    InvalidTimeLockPeriod(u64),

    #[error("time arithmetic overflow")]
    TimeOverflow,

    #[error("transaction not found: {0}")]
    NotFound(TxId),

    #[error("transaction {tx_id} is {status}, not PENDING")]
    NotPending { tx_id: TxId, status: TxStatus },

    #[error("chain id mismatch: expected {expected}, got {got}")]
    ChainIdMismatch { expected: u64, got: u64 },

    #[error("meta-transaction addressed to {got}, not this engine")]
    HandlerContractMismatch { got: Identity },

    #[error("meta-transaction action {got} cannot be used here (expected {expected})")]
    ActionMismatch { expected: Action, got: Action },

    #[error("record snapshot does not match stored transaction {0}")]
    SnapshotMismatch(TxId),

    #[error("submitted digest does not match the recomputed digest")]
    DigestMismatch,

    #[error("encoded call data does not match handler and digest")]
    CallDataMismatch,

    #[error("request-and-approve requester {requester} is not the signer {signer}")]
    RequesterMismatch {
        requester: Identity,
        signer: Identity,
    },

    #[error("gas price {actual} exceeds signed maximum {max}")]
    GasPriceExceeded { max: u128, actual: u128 },

    #[error("invalid configuration: {0}")]
    Config(String),

    // ── authorization ───────────────────────────────────────────────
    #[error("{identity} is not granted {action} on {selector}")]
    Unauthorized {
        identity: Identity,
        selector: Selector,
        action: Action,
    },

    #[error("{caller} is not the requester of {tx_id}")]
    NotRequester { tx_id: TxId, caller: Identity },

    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] CryptoError),

    // ── timing ──────────────────────────────────────────────────────
    #[error("time-lock of {tx_id} releases at {release_time}, now {now}")]
    TimeLockNotExpired {
        tx_id: TxId,
        release_time: u64,
        now: u64,
    },

    #[error("meta-transaction expired at {deadline}, now {now}")]
    Expired { deadline: u64, now: u64 },

    // ── replay ──────────────────────────────────────────────────────
    #[error("nonce replayed for {signer}: expected {expected}, got {got}")]
    NonceReplayed {
        signer: Identity,
        expected: u64,
        got: u64,
    },

    // ── internal ────────────────────────────────────────────────────
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

/// Recovery class of an [`EngineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller corrects the request and retries.
    Validation,
    /// The identity lacks the granted action or its signature is invalid.
    Authorization,
    /// Wait for the time-lock, or resubmit a fresh meta-transaction.
    Timing,
    /// Re-query the signer nonce and re-sign.
    Replay,
    /// The engine itself is inconsistent.
    Internal,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::UnknownOperationType(_)
            | EngineError::InvalidOperationType(_)
            | EngineError::OperationTypeAlreadyExists(_)
            | EngineError::InvalidWorkflow(_)
            | EngineError::WorkflowViolation { .. }
            | EngineError::UnknownFunction(_)
            | EngineError::FunctionAlreadyExists(_)
            | EngineError::HandlerMismatch { .. }
            | EngineError::UnsupportedAction { .. }
            | EngineError::UnknownRole(_)
            | EngineError::RoleAlreadyExists(_)
            | EngineError::InvalidRoleDefinition(_)
            | EngineError::RoleFull { .. }
            | EngineError::AlreadyMember { .. }
            | EngineError::NotMember { .. }
            | EngineError::ProtectedRole(_)
            | EngineError::InvalidExecutionPayload(_)
            | EngineError::InvalidPayment(_)
            | EngineError::InvalidTimeLockPeriod(_)
            | EngineError::TimeOverflow
            | EngineError::NotFound(_)
            | EngineError::NotPending { .. }
            | EngineError::ChainIdMismatch { .. }
            | EngineError::HandlerContractMismatch { .. }
            | EngineError::ActionMismatch { .. }
            | EngineError::SnapshotMismatch(_)
            | EngineError::DigestMismatch
            | EngineError::CallDataMismatch
            | EngineError::RequesterMismatch { .. }
            | EngineError::GasPriceExceeded { .. }
            | EngineError::Config(_) => ErrorKind::Validation,

            EngineError::Unauthorized { .. }
            | EngineError::NotRequester { .. }
            | EngineError::InvalidSignature(_) => ErrorKind::Authorization,

            EngineError::TimeLockNotExpired { .. } | EngineError::Expired { .. } => {
                ErrorKind::Timing
            }

            EngineError::NonceReplayed { .. } => ErrorKind::Replay,

            EngineError::Invariant(_) => ErrorKind::Internal,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
