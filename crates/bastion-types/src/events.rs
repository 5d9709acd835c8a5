use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::ids::{Identity, OperationTypeId, TxId};
use crate::record::TxStatus;

/// A lifecycle event emitted on every state change of a record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub event_id: uuid::Uuid,
    pub tx_id: TxId,
    pub operation_type: OperationTypeId,
    /// Engine clock at emission (unix seconds).
    pub at: u64,
    pub kind: LifecycleEventKind,
}

impl LifecycleEvent {
    pub fn new(
        tx_id: TxId,
        operation_type: OperationTypeId,
        at: u64,
        kind: LifecycleEventKind,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4(),
            tx_id,
            operation_type,
            at,
            kind,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            LifecycleEventKind::Requested { .. } => "Requested",
            LifecycleEventKind::Approved { .. } => "Approved",
            LifecycleEventKind::Cancelled { .. } => "Cancelled",
            LifecycleEventKind::Executed { .. } => "Executed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEventKind {
    Requested {
        requester: Identity,
        release_time: u64,
    },
    Approved {
        by: Identity,
        action: Action,
    },
    Cancelled {
        by: Identity,
        action: Action,
    },
    Executed {
        status: TxStatus,
        result: Vec<u8>,
    },
}
