//! Core type definitions for the Bastion secure operation engine.
//!
//! No business logic, just types shared by the crypto layer, the engine and
//! the collaborators that drive it.

pub mod action;
pub mod error;
pub mod events;
pub mod ids;
pub mod metatx;
pub mod record;

pub use action::Action;
pub use error::TypesError;
pub use events::{LifecycleEvent, LifecycleEventKind};
pub use ids::{Digest, Identity, OperationTypeId, RoleHash, Selector, TxId};
pub use metatx::{MetaTxParams, RecordSnapshot, SignedMetaTx, UnsignedMetaTx};
pub use record::{Execution, ExecutionType, PaymentDetails, TxParams, TxRecord, TxStatus};
