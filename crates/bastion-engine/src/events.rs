use std::sync::{Arc, Mutex, MutexGuard};

use bastion_types::{LifecycleEvent, LifecycleEventKind};
use tracing::info;

/// Receives a lifecycle event for every record state change.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &LifecycleEvent);
}

/// Forwards events to `tracing` under the `bastion::events` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &LifecycleEvent) {
        match &event.kind {
            LifecycleEventKind::Requested {
                requester,
                release_time,
            } => info!(
                target: "bastion::events",
                kind = event.name(),
                tx_id = %event.tx_id,
                operation_type = %event.operation_type,
                requester = %requester,
                release_time,
                "Lifecycle event"
            ),
            LifecycleEventKind::Approved { by, action }
            | LifecycleEventKind::Cancelled { by, action } => {
                info!(
                    target: "bastion::events",
                    kind = event.name(),
                    tx_id = %event.tx_id,
                    operation_type = %event.operation_type,
                    by = %by,
                    action = %action,
                    "Lifecycle event"
                )
            }
            LifecycleEventKind::Executed { status, result } => info!(
                target: "bastion::events",
                kind = event.name(),
                tx_id = %event.tx_id,
                operation_type = %event.operation_type,
                status = %status,
                result_len = result.len(),
                "Lifecycle event"
            ),
        }
    }
}

/// Keeps events in memory. Clones share the buffer.
#[derive(Clone, Debug, Default)]
pub struct MemoryEventSink {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<LifecycleEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.buffer().clone()
    }

    /// Event names in emission order, e.g. `["Requested", "Approved"]`.
    pub fn names(&self) -> Vec<&'static str> {
        self.buffer().iter().map(LifecycleEvent::name).collect()
    }

    pub fn clear(&self) {
        self.buffer().clear();
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &LifecycleEvent) {
        self.buffer().push(event.clone());
    }
}

/// Fans one event out to several sinks.
#[derive(Default)]
pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl EventSink for CompositeEventSink {
    fn emit(&self, event: &LifecycleEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_types::{Identity, OperationTypeId, TxId};

    fn requested() -> LifecycleEvent {
        LifecycleEvent::new(
            TxId(1),
            OperationTypeId::from_name("ADDR_UPDATE"),
            10,
            LifecycleEventKind::Requested {
                requester: Identity::ZERO,
                release_time: 70,
            },
        )
    }

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemoryEventSink::new();
        sink.emit(&requested());
        sink.emit(&requested());
        assert_eq!(sink.names(), vec!["Requested", "Requested"]);
        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn composite_fans_out() {
        let a = MemoryEventSink::new();
        let b = MemoryEventSink::new();
        let composite = CompositeEventSink::new()
            .with(a.clone())
            .with(b.clone())
            .with(TracingEventSink);
        composite.emit(&requested());
        assert_eq!(a.events().len(), 1);
        assert_eq!(b.events().len(), 1);
    }
}
