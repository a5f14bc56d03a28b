//! Processor strategies that drive an operation's processing step.
//!
//! - [`SimpleProcessor`]: cooperative, runs on whichever thread delivers
//!   input (or calls `start` on a source).
//! - [`ThreadedProcessor`]: one dedicated worker thread per operation.
//!
//! Both share the cycle dispatch below: the flow controller picks a
//! [`FlowState`] under the state lock, the lock is released, and the state is
//! turned into user callbacks plus tag forwarding.

pub mod simple;
pub mod threaded;

pub use simple::SimpleProcessor;
pub use threaded::ThreadedProcessor;

use crate::pipeline::error::ExecutionError;
use crate::pipeline::flow::FlowState;
use crate::pipeline::operation::OperationCore;
use crate::variant::{tags, SocketState, Variant};
use serde::{Deserialize, Serialize};

/// Which processor strategy an operation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    Simple,
    #[default]
    Threaded,
}

/// Closed set of processor strategies, chosen once per operation.
#[derive(Debug)]
pub enum Processor {
    Simple(SimpleProcessor),
    Threaded(ThreadedProcessor),
}

impl Processor {
    pub fn new(kind: ProcessorKind) -> Self {
        match kind {
            ProcessorKind::Simple => Processor::Simple(SimpleProcessor::new()),
            ProcessorKind::Threaded => Processor::Threaded(ThreadedProcessor::new()),
        }
    }

    pub fn kind(&self) -> ProcessorKind {
        match self {
            Processor::Simple(_) => ProcessorKind::Simple,
            Processor::Threaded(_) => ProcessorKind::Threaded,
        }
    }
}

/// Work selected for one cycle.
#[derive(Debug)]
pub(crate) struct Cycle {
    pub state: FlowState,
    pub inputs: Vec<Variant>,
    pub property_set: Option<String>,
    pub group: i32,
}

impl Cycle {
    /// A production step of an operation without connected inputs.
    pub fn source(input_count: usize) -> Self {
        Self {
            state: FlowState::Processable,
            inputs: vec![Variant::invalid(); input_count],
            property_set: None,
            group: 0,
        }
    }

    /// The control tag consumed by a tag cycle.
    pub fn tag(&self) -> Option<&Variant> {
        self.inputs.iter().find(|v| v.is_control())
    }
}

/// Runs one cycle. Called without the state lock.
pub(crate) fn dispatch(core: &OperationCore, cycle: Cycle) -> Result<(), ExecutionError> {
    let tag = cycle.tag().cloned();
    let Cycle {
        state,
        mut inputs,
        property_set,
        group,
    } = cycle;

    match state {
        FlowState::Incomplete => Ok(()),
        FlowState::Processable => match core.invoke(&mut inputs, group, |op, ctx| op.process(ctx)) {
            Err(ExecutionError::Paused) => pause_protocol(core, None),
            Err(ExecutionError::Finished) => stop_protocol(core, None),
            other => other,
        },
        FlowState::Synchronized => forward(core, tag),
        FlowState::Reconfigurable => {
            if let Some(name) = property_set {
                core.apply_property_set(&name)?;
            }
            forward(core, tag)
        }
        FlowState::Paused => pause_protocol(core, tag),
        FlowState::Finished => stop_protocol(core, tag),
        FlowState::Resumed => resume_protocol(core, tag),
    }
}

fn forward(core: &OperationCore, tag: Option<Variant>) -> Result<(), ExecutionError> {
    match tag {
        Some(tag) => core.emit_all(&tag),
        None => Ok(()),
    }
}

/// Calls `operation_paused`, passes a pause tag downstream and signals
/// `Paused` to the caller.
pub(crate) fn pause_protocol(core: &OperationCore, received: Option<Variant>) -> Result<(), ExecutionError> {
    core.invoke(&mut [], 0, |op, ctx| op.operation_paused(ctx))?;
    core.emit_all(&received.unwrap_or_else(tags::pause_tag))?;
    Err(ExecutionError::Paused)
}

/// Calls `operation_stopped`, passes a stop tag downstream and signals
/// `Finished` to the caller.
pub(crate) fn stop_protocol(core: &OperationCore, received: Option<Variant>) -> Result<(), ExecutionError> {
    core.invoke(&mut [], 0, |op, ctx| op.operation_stopped(ctx))?;
    core.emit_all(&received.unwrap_or_else(tags::stop_tag))?;
    Err(ExecutionError::Finished)
}

pub(crate) fn resume_protocol(core: &OperationCore, received: Option<Variant>) -> Result<(), ExecutionError> {
    core.invoke(&mut [], 0, |op, ctx| op.operation_resumed(ctx))?;
    let tag = received.unwrap_or_else(|| tags::resume_tag(SocketState::default()));
    core.emit_all(&tag)
}

/// Applies a property set on a source and tells downstream to follow.
pub(crate) fn reconfigure_source(core: &OperationCore, name: &str) {
    let result = core
        .apply_property_set(name)
        .and_then(|_| core.emit_all(&tags::reconfiguration_tag(name)));
    if let Err(e) = result {
        core.report(format!("Reconfiguring {} failed: {}", core.name(), e));
    }
}
