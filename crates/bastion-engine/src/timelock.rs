use std::collections::BTreeMap;

use bastion_types::{OperationTypeId, TxId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, EngineResult};

/// When a time-delay cancellation is allowed for an operation type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelWindow {
    /// Any time while the record is pending.
    #[default]
    Anytime,
    /// Only once `now >= release_time`, like approval.
    AfterRelease,
}

/// Release-time computation per operation type.
#[derive(Debug, Clone)]
pub struct TimeLockPolicy {
    default_period: u64,
    periods: BTreeMap<OperationTypeId, u64>,
    cancel_windows: BTreeMap<OperationTypeId, CancelWindow>,
}

impl TimeLockPolicy {
    pub fn new(default_period: u64) -> EngineResult<Self> {
        validate_period(default_period)?;
        Ok(Self {
            default_period,
            periods: BTreeMap::new(),
            cancel_windows: BTreeMap::new(),
        })
    }

    pub fn default_period(&self) -> u64 {
        self.default_period
    }

    pub fn period_for(&self, operation_type: OperationTypeId) -> u64 {
        self.periods
            .get(&operation_type)
            .copied()
            .unwrap_or(self.default_period)
    }

    pub fn release_time_for(&self, operation_type: OperationTypeId, now: u64) -> EngineResult<u64> {
        now.checked_add(self.period_for(operation_type))
            .ok_or(EngineError::TimeOverflow)
    }

    /// Set the period for one operation type, returning the previous one.
    ///
    /// Existing records keep the release time computed at creation.
    pub fn set_period(
        &mut self,
        operation_type: OperationTypeId,
        period: u64,
    ) -> EngineResult<u64> {
        validate_period(period)?;
        let previous = self.period_for(operation_type);
        self.periods.insert(operation_type, period);
        info!(operation_type = %operation_type, previous, period, "Time-lock period updated");
        Ok(previous)
    }

    pub fn cancel_window(&self, operation_type: OperationTypeId) -> CancelWindow {
        self.cancel_windows
            .get(&operation_type)
            .copied()
            .unwrap_or_default()
    }

    pub fn set_cancel_window(&mut self, operation_type: OperationTypeId, window: CancelWindow) {
        self.cancel_windows.insert(operation_type, window);
    }

    pub fn check_released(&self, tx_id: TxId, release_time: u64, now: u64) -> EngineResult<()> {
        if now < release_time {
            return Err(EngineError::TimeLockNotExpired {
                tx_id,
                release_time,
                now,
            });
        }
        Ok(())
    }

    pub fn check_cancellable(
        &self,
        tx_id: TxId,
        operation_type: OperationTypeId,
        release_time: u64,
        now: u64,
    ) -> EngineResult<()> {
        match self.cancel_window(operation_type) {
            CancelWindow::Anytime => Ok(()),
            CancelWindow::AfterRelease => self.check_released(tx_id, release_time, now),
        }
    }
}

fn validate_period(period: u64) -> EngineResult<()> {
    if period == 0 {
        return Err(EngineError::InvalidTimeLockPeriod(period));
    }
    Ok(())
}
