//! Test operations and builders

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use visflow::pipeline::{
    CheckContext, ExecutionError, Operation, OperationCore, OperationId, OperationSettings,
    PipelineResult, PortDescriptor, ProcessContext, ProcessorKind, PropertySet,
};
use visflow::Variant;

/// Wraps `body` in a stand-alone operation core
pub fn operation(id: u32, name: &str, body: impl Operation + 'static, kind: ProcessorKind) -> Arc<OperationCore> {
    OperationCore::new(
        OperationId(id),
        name,
        Box::new(body),
        kind,
        OperationSettings::default(),
    )
}

// ==================== Feed Source ====================

static FEED_PORTS: &[PortDescriptor] = &[PortDescriptor::output("output")];

/// Cooperative source that emits one queued object per `start()`
#[derive(Default)]
pub struct FeedSource {
    queue: Arc<Mutex<VecDeque<Variant>>>,
}

impl Operation for FeedSource {
    fn name(&self) -> &str {
        "FeedSource"
    }

    fn ports(&self) -> &[PortDescriptor] {
        FEED_PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        let next = self.queue.lock().pop_front();
        match next {
            Some(object) => ctx.emit(0, object),
            None => Ok(()),
        }
    }
}

/// Handle for pushing objects through a [`FeedSource`]
pub struct Feeder {
    pub core: Arc<OperationCore>,
    queue: Arc<Mutex<VecDeque<Variant>>>,
}

impl Feeder {
    pub fn new(id: u32) -> Self {
        let source = FeedSource::default();
        let queue = Arc::clone(&source.queue);
        Self {
            core: operation(id, "feeder", source, ProcessorKind::Simple),
            queue,
        }
    }

    /// Emits `object` downstream on the calling thread
    pub fn send(&self, object: impl Into<Variant>) -> PipelineResult<()> {
        self.queue.lock().push_back(object.into());
        self.core.start()
    }
}

// ==================== Recorder ====================

/// Callback observed by a [`Recorder`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Check(bool),
    Process(Variant),
    Paused,
    Stopped,
    Resumed,
    Reconfigured(String),
}

/// Shared view of a recorder's calls
#[derive(Debug, Clone, Default)]
pub struct RecorderHandle {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecorderHandle {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn processed(&self) -> Vec<Variant> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Process(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn process_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Call::Process(_)))
            .count()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }
}

static RECORDER_PORTS: &[PortDescriptor] = &[
    PortDescriptor::optional_input("input"),
    PortDescriptor::output("output"),
];

/// Records every callback and forwards its input.
///
/// Without a connected input it acts as a source. Scripted signals can be
/// raised on the n-th `process` call (1-based).
#[derive(Default)]
pub struct Recorder {
    handle: RecorderHandle,
    processed: usize,
    pause_at: Option<usize>,
    finish_at: Option<usize>,
    fail_at: Option<usize>,
    delay: Option<Duration>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> RecorderHandle {
        self.handle.clone()
    }

    pub fn pause_at(mut self, n: usize) -> Self {
        self.pause_at = Some(n);
        self
    }

    pub fn finish_at(mut self, n: usize) -> Self {
        self.finish_at = Some(n);
        self
    }

    pub fn fail_at(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn record(&self, call: Call) {
        self.handle.calls.lock().push(call);
    }
}

impl Operation for Recorder {
    fn name(&self) -> &str {
        "Recorder"
    }

    fn ports(&self) -> &[PortDescriptor] {
        RECORDER_PORTS
    }

    fn check(&mut self, ctx: &CheckContext) -> Result<(), ExecutionError> {
        self.record(Call::Check(ctx.reset()));
        Ok(())
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        self.processed += 1;
        let object = ctx.input(0).clone();
        self.record(Call::Process(object.clone()));
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail_at == Some(self.processed) {
            return Err(ExecutionError::error(format!("scripted failure at {}", self.processed)));
        }
        if self.pause_at == Some(self.processed) {
            return Err(ExecutionError::Paused);
        }
        if self.finish_at == Some(self.processed) {
            return Err(ExecutionError::Finished);
        }
        if object.is_valid() {
            ctx.emit(0, object)?;
        }
        Ok(())
    }

    fn operation_paused(&mut self, _ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        self.record(Call::Paused);
        Ok(())
    }

    fn operation_stopped(&mut self, _ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        self.record(Call::Stopped);
        Ok(())
    }

    fn operation_resumed(&mut self, _ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        self.record(Call::Resumed);
        Ok(())
    }

    fn apply_property_set(&mut self, set: &PropertySet) -> Result<(), ExecutionError> {
        self.record(Call::Reconfigured(set.name().to_string()));
        Ok(())
    }
}
