//! CollectorSink: records everything it receives.
//!
//! The sink shares its records with a [`CollectorHandle`] so callers can
//! inspect the stream from outside the engine.

use crate::pipeline::error::ExecutionError;
use crate::pipeline::operation::{Operation, ProcessContext};
use crate::pipeline::port::PortDescriptor;
use crate::pipeline::property::PropertySet;
use crate::variant::Variant;
use parking_lot::Mutex;
use std::sync::Arc;

static PORTS: &[PortDescriptor] = &[PortDescriptor::input("input")];

/// One entry in a collector's log.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectorRecord {
    Object(Variant),
    Paused,
    Resumed,
    Stopped,
    /// A property set was applied.
    Reconfigured(String),
}

/// Shared view of a [`CollectorSink`]'s records.
#[derive(Debug, Clone, Default)]
pub struct CollectorHandle {
    records: Arc<Mutex<Vec<CollectorRecord>>>,
}

impl CollectorHandle {
    pub fn records(&self) -> Vec<CollectorRecord> {
        self.records.lock().clone()
    }

    /// Received data objects, in arrival order.
    pub fn objects(&self) -> Vec<Variant> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                CollectorRecord::Object(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, record: &CollectorRecord) -> usize {
        self.records.lock().iter().filter(|r| *r == record).count()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    fn push(&self, record: CollectorRecord) {
        self.records.lock().push(record);
    }
}

/// Sink that records objects and lifecycle callbacks.
#[derive(Debug, Clone, Default)]
pub struct CollectorSink {
    handle: CollectorHandle,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> CollectorHandle {
        self.handle.clone()
    }
}

impl Operation for CollectorSink {
    fn name(&self) -> &str {
        "CollectorSink"
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        let object = ctx.take_input(0);
        tracing::trace!("{} collected {}", ctx.name(), object.type_id());
        self.handle.push(CollectorRecord::Object(object));
        Ok(())
    }

    fn operation_paused(&mut self, _ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        self.handle.push(CollectorRecord::Paused);
        Ok(())
    }

    fn operation_stopped(&mut self, _ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        self.handle.push(CollectorRecord::Stopped);
        Ok(())
    }

    fn operation_resumed(&mut self, _ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        self.handle.push(CollectorRecord::Resumed);
        Ok(())
    }

    fn apply_property_set(&mut self, set: &PropertySet) -> Result<(), ExecutionError> {
        self.handle.push(CollectorRecord::Reconfigured(set.name().to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_is_shared() {
        let mut sink = CollectorSink::new();
        let handle = sink.handle();
        assert!(handle.is_empty());
        sink.apply_property_set(&PropertySet::new("night")).unwrap();
        handle.push(CollectorRecord::Object(Variant::new(1i32)));
        assert_eq!(handle.len(), 2);
        assert_eq!(handle.objects(), vec![Variant::new(1i32)]);
        assert_eq!(
            handle.count(&CollectorRecord::Reconfigured("night".into())),
            1
        );
        handle.clear();
        assert!(sink.handle().is_empty());
    }
}
