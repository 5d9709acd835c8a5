//! Bastion secure operation engine.
//!
//! Sensitive state changes go through one lifecycle with two approval tracks:
//!
//! - **Time-delay**: `create` opens a PENDING record; once its release time
//!   has passed, an identity granted `TimeDelayApprove` executes it.
//! - **Meta-transaction**: a signer authorizes approval, cancellation or a
//!   combined request-and-approve off-line; a relayer submits the signed
//!   payload and the wait is skipped.
//!
//! Components:
//! - [`PermissionRegistry`]: roles, function schemas, grants
//! - [`OperationCatalog`]: operation types and their workflow paths
//! - [`TimeLockPolicy`]: release times and cancel windows
//! - [`MetaTransactionVerifier`]: digests, signatures, deadlines, nonces
//! - [`TransactionLedger`]: records and status transitions
//! - [`OperationExecutor`]: dispatch of approved records
//!
//! [`SecureOperationEngine`] composes them; [`EngineHandle`] shares one
//! engine across tasks.

#![deny(unsafe_code)]

pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod executor;
pub mod ledger;
pub mod metatx;
pub mod permissions;
pub mod service;
pub mod telemetry;
pub mod timelock;

pub use catalog::{OperationCatalog, OperationTypeEntry, WorkflowPath};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    ConfigError, EngineConfig, LoggingConfig, OperationOverride, TimeLockConfig,
    DEFAULT_ENGINE_IDENTITY,
};
pub use engine::{
    encode_timelock_update, Collaborators, SecureOperationEngine, SET_TIMELOCK_PERIOD,
    TIMELOCK_UPDATE, TIMELOCK_UPDATE_META, TIMELOCK_UPDATE_REQUEST,
};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use events::{CompositeEventSink, EventSink, MemoryEventSink, TracingEventSink};
pub use executor::{
    CallPayload, DispatchCall, DispatchError, ExecutionOutcome, OperationExecutor,
    RecordingDispatcher, TargetDispatcher,
};
pub use ledger::{StatusCounts, TransactionLedger};
pub use metatx::{MetaTransactionVerifier, NonceRegistry, RelayContext};
pub use permissions::{FunctionSchema, ParamDescriptor, PermissionRegistry, Role};
pub use service::EngineHandle;
pub use telemetry::init_tracing;
pub use timelock::{CancelWindow, TimeLockPolicy};
