//! Operations: user processing code plus the shared core that drives it.
//!
//! User code implements [`Operation`]. The engine wraps each one in an
//! [`OperationCore`], which owns the ports, the state machine, the processor
//! strategy and the event bus. All state lives behind a single mutex and
//! condition variable inside the core. Processors borrow the core; they never
//! store a pointer back to it.

use crate::pipeline::error::{ExecutionError, PipelineError, PipelineResult};
use crate::pipeline::events::{EventBus, OperationEvent};
use crate::pipeline::flow::{DefaultFlowController, FlowController, FlowState};
use crate::pipeline::id::OperationId;
use crate::pipeline::port::{InputQueue, InputSet, OutputPort, PortDescriptor, PortDirection};
use crate::pipeline::processor::{Cycle, Processor, ProcessorKind};
use crate::pipeline::property::PropertySet;
use crate::pipeline::state::{Committed, OperationState, Request, StateMachine};
use crate::variant::Variant;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

static INVALID: Variant = Variant::invalid();

/// User-implemented processing stage.
///
/// Every callback may fail with an [`ExecutionError`]. `Paused` and
/// `Finished` returned from `process` end the stream the same way a received
/// pause or stop tag would.
pub trait Operation: Send {
    /// Human-readable name of this operation type.
    fn name(&self) -> &str;

    /// Port descriptors for this operation.
    fn ports(&self) -> &[PortDescriptor];

    /// Validates the configuration before a run.
    fn check(&mut self, _ctx: &CheckContext) -> Result<(), ExecutionError> {
        Ok(())
    }

    /// Handles one complete set of input objects (or one production step for
    /// a source).
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ExecutionError>;

    fn operation_paused(&mut self, _ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        Ok(())
    }

    fn operation_stopped(&mut self, _ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        Ok(())
    }

    fn operation_resumed(&mut self, _ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        Ok(())
    }

    fn set_property(&mut self, name: &str, _value: &Variant) -> Result<(), ExecutionError> {
        Err(ExecutionError::error(format!(
            "{} has no property '{}'",
            self.name(),
            name
        )))
    }

    fn property(&self, _name: &str) -> Option<Variant> {
        None
    }

    fn apply_property_set(&mut self, set: &PropertySet) -> Result<(), ExecutionError> {
        for (name, value) in set.iter() {
            self.set_property(name, value)?;
        }
        Ok(())
    }
}

/// Information available to [`Operation::check`].
#[derive(Debug, Clone)]
pub struct CheckContext {
    reset: bool,
    inputs: Vec<(&'static str, bool)>,
}

impl CheckContext {
    /// Whether the operation is being prepared for a fresh run.
    #[inline]
    pub fn reset(&self) -> bool {
        self.reset
    }

    pub fn is_connected(&self, input: usize) -> bool {
        self.inputs.get(input).map(|(_, c)| *c).unwrap_or(false)
    }

    pub fn is_connected_by_name(&self, input: &str) -> bool {
        self.inputs.iter().any(|(name, c)| *name == input && *c)
    }
}

/// View handed to operation callbacks while a cycle runs.
pub struct ProcessContext<'a> {
    core: &'a OperationCore,
    inputs: &'a mut [Variant],
    group: i32,
}

impl<'a> ProcessContext<'a> {
    /// Object selected on `input`, or an invalid variant.
    pub fn input(&self, input: usize) -> &Variant {
        self.inputs.get(input).unwrap_or(&INVALID)
    }

    pub fn input_by_name(&self, name: &str) -> &Variant {
        match self.core.input_index(name) {
            Some(index) => self.input(index),
            None => &INVALID,
        }
    }

    /// Moves the object out of `input`, leaving an invalid variant.
    pub fn take_input(&mut self, input: usize) -> Variant {
        self.inputs.get_mut(input).map(std::mem::take).unwrap_or_default()
    }

    pub fn is_connected(&self, input: usize) -> bool {
        self.core.is_input_connected(input)
    }

    /// Sends `object` to every input connected to `output`. Blocks while a
    /// receiver is full.
    pub fn emit(&self, output: usize, object: impl Into<Variant>) -> Result<(), ExecutionError> {
        self.core.emit(output, &object.into())
    }

    pub fn emit_by_name(&self, output: &str, object: impl Into<Variant>) -> Result<(), ExecutionError> {
        let index = self
            .core
            .output_index(output)
            .ok_or_else(|| ExecutionError::error(format!("No output named '{}'", output)))?;
        self.emit(index, object)
    }

    /// Instance name of the operation.
    pub fn name(&self) -> &str {
        self.core.name()
    }

    #[inline]
    pub fn active_input_group(&self) -> i32 {
        self.group
    }
}

/// Per-operation runtime settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSettings {
    pub queue_capacity: usize,
    /// Upper bound on one back-pressure wait before rechecking.
    pub emit_retry: Duration,
}

impl Default for OperationSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 4,
            emit_retry: Duration::from_millis(10),
        }
    }
}

/// State guarded by the operation's mutex.
pub(crate) struct Shared {
    pub state: StateMachine,
    pub inputs: InputSet,
    pub flow: Option<Box<dyn FlowController>>,
    /// Cleared by errors, end of stream and interrupts; set by `check(true)`.
    pub reset: bool,
    /// A cooperative cycle loop is in flight.
    pub processing: bool,
    /// Input arrived since the worker last drained its queues.
    pub wake_pending: bool,
    pub pending_property_set: Option<String>,
    pub worker_alive: bool,
}

impl Shared {
    /// Asks the flow controller for the next cycle. `None` means incomplete.
    pub fn next_cycle(&mut self) -> Result<Option<Cycle>, ExecutionError> {
        let Some(flow) = self.flow.as_mut() else {
            return Ok(None);
        };
        let state = flow.prepare_process(&mut self.inputs)?;
        if state == FlowState::Incomplete {
            return Ok(None);
        }
        let property_set = match state {
            FlowState::Reconfigurable => flow.property_set_name().map(str::to_owned),
            _ => None,
        };
        let group = flow.active_input_group();
        tracing::trace!("next cycle: {:?} (group {})", state, group);
        Ok(Some(Cycle {
            state,
            inputs: self.inputs.take_current(),
            property_set,
            group,
        }))
    }
}

/// Runtime wrapper around one [`Operation`].
pub struct OperationCore {
    id: OperationId,
    name: String,
    type_name: String,
    ports: Vec<PortDescriptor>,
    shared: Mutex<Shared>,
    condition: Condvar,
    body: Mutex<Box<dyn Operation>>,
    outputs: RwLock<Vec<OutputPort>>,
    property_sets: RwLock<HashMap<String, PropertySet>>,
    events: EventBus,
    processor: Processor,
    settings: OperationSettings,
}

impl OperationCore {
    pub fn new(
        id: OperationId,
        name: impl Into<String>,
        body: Box<dyn Operation>,
        kind: ProcessorKind,
        settings: OperationSettings,
    ) -> Arc<Self> {
        let ports = body.ports().to_vec();
        let inputs = ports
            .iter()
            .filter(|p| p.direction == PortDirection::Input)
            .map(|p| InputQueue::new(p.name, p.optional, settings.queue_capacity))
            .collect();
        let outputs = ports
            .iter()
            .filter(|p| p.direction == PortDirection::Output)
            .map(|p| OutputPort::new(p.name))
            .collect();
        let type_name = body.name().to_owned();

        Arc::new(Self {
            id,
            name: name.into(),
            type_name,
            ports,
            shared: Mutex::new(Shared {
                state: StateMachine::new(),
                inputs: InputSet::new(inputs),
                flow: None,
                reset: false,
                processing: false,
                wake_pending: false,
                pending_property_set: None,
                worker_alive: false,
            }),
            condition: Condvar::new(),
            body: Mutex::new(body),
            outputs: RwLock::new(outputs),
            property_sets: RwLock::new(HashMap::new()),
            events: EventBus::new(),
            processor: Processor::new(kind),
            settings,
        })
    }

    #[inline]
    pub fn id(&self) -> OperationId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        &self.ports
    }

    #[inline]
    pub fn processor_kind(&self) -> ProcessorKind {
        self.processor.kind()
    }

    #[inline]
    pub fn settings(&self) -> OperationSettings {
        self.settings
    }

    // ─── Control ────────────────────────────────────────────────────────

    pub fn start(self: &Arc<Self>) -> PipelineResult<()> {
        match &self.processor {
            Processor::Simple(p) => p.start(self),
            Processor::Threaded(p) => p.start(self),
        }
    }

    pub fn pause(&self) {
        match &self.processor {
            Processor::Simple(p) => p.pause(self),
            Processor::Threaded(p) => p.pause(self),
        }
    }

    pub fn stop(&self) {
        match &self.processor {
            Processor::Simple(p) => p.stop(self),
            Processor::Threaded(p) => p.stop(self),
        }
    }

    pub fn interrupt(&self) {
        match &self.processor {
            Processor::Simple(p) => p.interrupt(self),
            Processor::Threaded(p) => p.interrupt(self),
        }
    }

    /// Applies the named property set. Connected operations wait for the
    /// reconfiguration tag to arrive through their inputs instead.
    pub fn reconfigure(&self, property_set: &str) {
        match &self.processor {
            Processor::Simple(p) => p.reconfigure(self, property_set),
            Processor::Threaded(p) => p.reconfigure(self, property_set),
        }
    }

    /// Blocks until the operation stops. Returns `false` on timeout.
    pub fn wait(&self, timeout: Duration) -> bool {
        match &self.processor {
            Processor::Simple(p) => p.wait(self, timeout),
            Processor::Threaded(p) => p.wait(self, timeout),
        }
    }

    /// Offers `object` to `input`. Returns `false` if the queue is full.
    pub fn try_accept(&self, input: usize, object: &Variant) -> bool {
        match &self.processor {
            Processor::Simple(p) => p.try_accept(self, input, object),
            Processor::Threaded(p) => p.try_accept(self, input, object),
        }
    }

    pub fn state(&self) -> OperationState {
        self.shared.lock().state.state()
    }

    pub fn is_source(&self) -> bool {
        self.shared.lock().inputs.is_source()
    }

    /// Validates the operation and, with `reset`, prepares it for a new run.
    pub fn check(&self, reset: bool) -> PipelineResult<()> {
        let ctx = {
            let mut shared = self.shared.lock();
            if reset && shared.state.state() != OperationState::Stopped {
                return Err(PipelineError::NotStopped(self.name.clone()));
            }
            if let Some(missing) = shared
                .inputs
                .iter()
                .find(|i| !i.is_optional() && !i.is_connected())
            {
                return Err(PipelineError::UnconnectedInput {
                    operation: self.name.clone(),
                    input: missing.name().to_owned(),
                });
            }
            if !shared.inputs.is_source() && shared.flow.is_none() {
                shared.flow = Some(Box::new(DefaultFlowController::new()));
            }
            if reset {
                shared.inputs.clear();
                if let Some(flow) = shared.flow.as_mut() {
                    flow.reset();
                }
                shared.reset = true;
                shared.processing = false;
                shared.wake_pending = false;
                shared.pending_property_set = None;
            }
            CheckContext {
                reset,
                inputs: shared
                    .inputs
                    .iter()
                    .map(|i| (i.name(), i.is_connected()))
                    .collect(),
            }
        };

        self.body
            .lock()
            .check(&ctx)
            .map_err(|e| PipelineError::Check {
                operation: self.name.clone(),
                message: e.to_string(),
            })
    }

    // ─── Configuration ──────────────────────────────────────────────────

    pub fn subscribe(&self) -> Receiver<OperationEvent> {
        self.events.subscribe()
    }

    pub fn attach(&self, sender: Sender<OperationEvent>) {
        self.events.attach(sender);
    }

    pub fn add_property_set(&self, set: PropertySet) {
        self.property_sets.write().insert(set.name().to_owned(), set);
    }

    pub fn property_set(&self, name: &str) -> Option<PropertySet> {
        self.property_sets.read().get(name).cloned()
    }

    /// Replaces the default flow controller.
    pub fn set_flow_controller(&self, flow: Box<dyn FlowController>) {
        self.shared.lock().flow = Some(flow);
    }

    pub fn set_property(&self, name: &str, value: &Variant) -> PipelineResult<()> {
        self.body
            .lock()
            .set_property(name, value)
            .map_err(|e| PipelineError::Execution {
                operation: self.name.clone(),
                message: e.to_string(),
            })
    }

    pub fn property(&self, name: &str) -> Option<Variant> {
        self.body.lock().property(name)
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Input)
            .position(|p| p.name == name)
    }

    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Output)
            .position(|p| p.name == name)
    }

    pub fn is_input_connected(&self, input: usize) -> bool {
        self.shared
            .lock()
            .inputs
            .get(input)
            .map(InputQueue::is_connected)
            .unwrap_or(false)
    }

    /// Links `output` of this operation to `input` of `target`.
    pub fn connect(&self, output: usize, target: &Arc<OperationCore>, input: usize) -> PipelineResult<()> {
        for op in [self, target.as_ref()] {
            if op.state() != OperationState::Stopped {
                return Err(PipelineError::NotStopped(op.name.clone()));
            }
        }

        let mut outputs = self.outputs.write();
        let port = outputs.get_mut(output).ok_or_else(|| PipelineError::UnknownPort {
            operation: self.name.clone(),
            direction: PortDirection::Output,
            port: output.to_string(),
        })?;
        {
            let mut shared = target.shared.lock();
            let queue = shared
                .inputs
                .get_mut(input)
                .ok_or_else(|| PipelineError::UnknownPort {
                    operation: target.name.clone(),
                    direction: PortDirection::Input,
                    port: input.to_string(),
                })?;
            queue.connect(port.waker());
        }
        port.add_connection(Arc::clone(target), input);
        Ok(())
    }

    // ─── Processor internals ────────────────────────────────────────────

    pub(crate) fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock()
    }

    pub(crate) fn condition(&self) -> &Condvar {
        &self.condition
    }

    pub(crate) fn is_interrupted(&self) -> bool {
        self.shared.lock().state.is_interrupted()
    }

    /// Commits a state. Must be called with the state lock held.
    pub(crate) fn commit(&self, shared: &mut Shared, state: Committed) {
        let from = shared.state.state();
        shared.state.commit(state);
        self.changed(from, shared.state.state());
    }

    pub(crate) fn request(&self, shared: &mut Shared, request: Request) {
        let from = shared.state.state();
        shared.state.request(request);
        self.changed(from, shared.state.state());
    }

    fn changed(&self, from: OperationState, to: OperationState) {
        self.condition.notify_all();
        if from == to {
            return;
        }
        tracing::debug!("{}: {} -> {}", self.name, from, to);
        self.events.publish(OperationEvent::StateChanged {
            id: self.id,
            name: self.name.clone(),
            from,
            to,
        });
    }

    /// Logs an execution error and notifies listeners.
    pub(crate) fn report(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{}: {}", self.name, message);
        self.events.publish(OperationEvent::Error {
            id: self.id,
            name: self.name.clone(),
            message,
            at: chrono::Utc::now(),
        });
    }

    /// Runs `f` on the operation body. Must not be called with the state lock
    /// held.
    pub(crate) fn invoke<F>(&self, inputs: &mut [Variant], group: i32, f: F) -> Result<(), ExecutionError>
    where
        F: FnOnce(&mut dyn Operation, &mut ProcessContext) -> Result<(), ExecutionError>,
    {
        let mut body = self.body.lock();
        let mut ctx = ProcessContext {
            core: self,
            inputs,
            group,
        };
        f(&mut **body, &mut ctx)
    }

    pub(crate) fn emit(&self, output: usize, object: &Variant) -> Result<(), ExecutionError> {
        let outputs = self.outputs.read();
        let port = outputs
            .get(output)
            .ok_or_else(|| ExecutionError::error(format!("{} has no output {}", self.name, output)))?;
        port.emit(self, object, self.settings.emit_retry)
    }

    /// Sends `object` through every output.
    pub(crate) fn emit_all(&self, object: &Variant) -> Result<(), ExecutionError> {
        let outputs = self.outputs.read();
        for port in outputs.iter() {
            port.emit(self, object, self.settings.emit_retry)?;
        }
        Ok(())
    }

    /// Applies a registered property set. Unknown names are skipped.
    pub(crate) fn apply_property_set(&self, name: &str) -> Result<(), ExecutionError> {
        let Some(set) = self.property_set(name) else {
            tracing::warn!("{}: unknown property set '{}'", self.name, name);
            return Ok(());
        };
        tracing::debug!("{}: applying property set '{}'", self.name, name);
        self.body.lock().apply_property_set(&set)
    }
}

impl fmt::Debug for OperationCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("processor", &self.processor.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler {
        factor: i32,
    }

    static DOUBLER_PORTS: [PortDescriptor; 3] = [
        PortDescriptor::input("input"),
        PortDescriptor::optional_input("gain"),
        PortDescriptor::output("output"),
    ];

    impl Operation for Doubler {
        fn name(&self) -> &str {
            "Doubler"
        }

        fn ports(&self) -> &[PortDescriptor] {
            &DOUBLER_PORTS
        }

        fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
            let value = ctx.input(0).convert_to(0i32);
            ctx.emit(0, value * self.factor)
        }

        fn set_property(&mut self, name: &str, value: &Variant) -> Result<(), ExecutionError> {
            match name {
                "factor" => {
                    self.factor = value.convert_to(self.factor);
                    Ok(())
                }
                _ => Err(ExecutionError::error(format!("no property {}", name))),
            }
        }

        fn property(&self, name: &str) -> Option<Variant> {
            (name == "factor").then(|| Variant::new(self.factor))
        }
    }

    fn doubler(kind: ProcessorKind) -> Arc<OperationCore> {
        OperationCore::new(
            OperationId(0),
            "double",
            Box::new(Doubler { factor: 2 }),
            kind,
            OperationSettings::default(),
        )
    }

    #[test]
    fn test_port_indices() {
        let op = doubler(ProcessorKind::Simple);
        assert_eq!(op.input_index("gain"), Some(1));
        assert_eq!(op.output_index("output"), Some(0));
        assert_eq!(op.output_index("input"), None);
        assert_eq!(op.type_name(), "Doubler");
        assert_eq!(op.processor_kind(), ProcessorKind::Simple);
    }

    #[test]
    fn test_check_requires_connected_inputs() {
        let op = doubler(ProcessorKind::Simple);
        match op.check(true) {
            Err(PipelineError::UnconnectedInput { input, .. }) => assert_eq!(input, "input"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_connect_and_check() {
        let a = doubler(ProcessorKind::Simple);
        let b = doubler(ProcessorKind::Simple);
        a.connect(0, &b, 0).unwrap();
        assert!(b.is_input_connected(0));
        assert!(!b.is_input_connected(1));
        assert!(!b.is_source());
        assert!(a.check(false).is_err());
        b.check(true).unwrap();
    }

    #[test]
    fn test_connect_rejects_bad_ports() {
        let a = doubler(ProcessorKind::Simple);
        let b = doubler(ProcessorKind::Simple);
        assert!(matches!(
            a.connect(3, &b, 0),
            Err(PipelineError::UnknownPort {
                direction: PortDirection::Output,
                ..
            })
        ));
        assert!(matches!(
            a.connect(0, &b, 7),
            Err(PipelineError::UnknownPort {
                direction: PortDirection::Input,
                ..
            })
        ));
    }

    #[test]
    fn test_properties_and_sets() {
        let op = doubler(ProcessorKind::Simple);
        op.set_property("factor", &Variant::new(5i32)).unwrap();
        assert_eq!(op.property("factor"), Some(Variant::new(5i32)));
        assert!(op.set_property("bogus", &Variant::new(1i32)).is_err());

        op.add_property_set(PropertySet::new("triple").with("factor", 3i32));
        op.apply_property_set("triple").unwrap();
        assert_eq!(op.property("factor"), Some(Variant::new(3i32)));

        // unknown sets are skipped
        op.apply_property_set("missing").unwrap();
        assert_eq!(op.property("factor"), Some(Variant::new(3i32)));
    }

    #[test]
    fn test_commit_publishes_state_changes() {
        let op = doubler(ProcessorKind::Simple);
        let rx = op.subscribe();
        {
            let mut shared = op.lock();
            op.commit(&mut shared, Committed::Running);
            op.commit(&mut shared, Committed::Running);
        }
        match rx.try_recv().unwrap() {
            OperationEvent::StateChanged { from, to, .. } => {
                assert_eq!(from, OperationState::Stopped);
                assert_eq!(to, OperationState::Running);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_report_publishes_error() {
        let op = doubler(ProcessorKind::Threaded);
        let rx = op.subscribe();
        op.report("boom");
        match rx.try_recv().unwrap() {
            OperationEvent::Error { message, name, .. } => {
                assert_eq!(message, "boom");
                assert_eq!(name, "double");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
