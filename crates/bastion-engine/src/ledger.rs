use std::collections::{BTreeMap, BTreeSet};

use bastion_types::{Action, Digest, PaymentDetails, Selector, TxId, TxParams, TxRecord, TxStatus};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{EngineError, EngineResult};

/// Number of records per status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.completed + self.cancelled + self.failed
    }
}

/// Owns every transaction record and the pending index.
///
/// Records are never deleted. Once a record leaves PENDING it is frozen: every
/// mutator here starts from [`TransactionLedger::pending`].
#[derive(Debug)]
pub struct TransactionLedger {
    records: BTreeMap<TxId, TxRecord>,
    /// Ids are allocated in call order, so ordered ids are creation order.
    pending: BTreeSet<TxId>,
    next_id: u64,
}

impl Default for TransactionLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            pending: BTreeSet::new(),
            next_id: 1,
        }
    }

    /// Id the next [`insert_pending`](Self::insert_pending) will allocate.
    pub fn next_id(&self) -> TxId {
        TxId(self.next_id)
    }

    /// Allocate an id and store a new PENDING record.
    pub fn insert_pending(
        &mut self,
        params: TxParams,
        handler_selector: Selector,
        created_at: u64,
        release_time: u64,
        opened_by: Action,
    ) -> EngineResult<TxId> {
        let id = TxId(self.next_id);
        let advanced = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| EngineError::Invariant("transaction id space exhausted".into()))?;

        let record = TxRecord {
            id,
            params,
            status: TxStatus::Pending,
            handler_selector,
            created_at,
            release_time,
            message: None,
            result: Vec::new(),
            payment: None,
            history: vec![opened_by],
        };
        if self.records.insert(id, record).is_some() {
            error!(tx_id = %id, "Transaction id reused");
            return Err(EngineError::Invariant(format!("{id} allocated twice")));
        }
        self.pending.insert(id);
        self.next_id = advanced;
        info!(tx_id = %id, release_time, "Transaction created");
        Ok(id)
    }

    pub fn get(&self, id: TxId) -> EngineResult<&TxRecord> {
        self.records.get(&id).ok_or(EngineError::NotFound(id))
    }

    /// The record, provided it is still PENDING.
    pub fn pending(&self, id: TxId) -> EngineResult<&TxRecord> {
        let record = self.get(id)?;
        if !record.is_pending() {
            return Err(EngineError::NotPending {
                tx_id: id,
                status: record.status,
            });
        }
        Ok(record)
    }

    pub fn attach_payment(&mut self, id: TxId, payment: PaymentDetails) -> EngineResult<()> {
        let record = self.pending_mut(id)?;
        record.payment = Some(payment);
        info!(tx_id = %id, "Payment attached");
        Ok(())
    }

    pub fn record_actions(&mut self, id: TxId, actions: &[Action]) -> EngineResult<()> {
        let record = self.pending_mut(id)?;
        record.history.extend_from_slice(actions);
        Ok(())
    }

    /// Move a PENDING record to a terminal status and drop it from the
    /// pending index.
    pub fn finalize(
        &mut self,
        id: TxId,
        status: TxStatus,
        result: Vec<u8>,
        message: Option<Digest>,
    ) -> EngineResult<&TxRecord> {
        if !status.is_terminal() {
            error!(tx_id = %id, %status, "Refusing non-terminal finalization");
            return Err(EngineError::Invariant(format!(
                "{id} cannot be finalized as {status}"
            )));
        }
        let record = self.pending_mut(id)?;
        record.status = status;
        record.result = result;
        if message.is_some() {
            record.message = message;
        }
        self.pending.remove(&id);
        info!(tx_id = %id, %status, "Transaction finalized");
        self.get(id)
    }

    /// Pending ids in creation order.
    pub fn pending_ids(&self) -> Vec<TxId> {
        self.pending.iter().copied().collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &TxRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        self.records
            .values()
            .fold(StatusCounts::default(), |mut counts, record| {
                match record.status {
                    TxStatus::Pending => counts.pending += 1,
                    TxStatus::Completed => counts.completed += 1,
                    TxStatus::Cancelled => counts.cancelled += 1,
                    TxStatus::Failed => counts.failed += 1,
                }
                counts
            })
    }

    fn pending_mut(&mut self, id: TxId) -> EngineResult<&mut TxRecord> {
        let record = self.records.get_mut(&id).ok_or(EngineError::NotFound(id))?;
        if !record.is_pending() {
            return Err(EngineError::NotPending {
                tx_id: id,
                status: record.status,
            });
        }
        Ok(record)
    }
}
