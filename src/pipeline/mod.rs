//! Operation execution engine.
//!
//! Operations are wired together through typed ports and exchange
//! [`Variant`](crate::variant::Variant)s. Control tags travel through the same
//! channels as data so that pause, resume, stop and reconfiguration follow
//! the stream.
//!
//! # Architecture
//!
//! ```text
//! [CounterSource] ──► [Scale] ──► [Comparison] ──► [CollectorSink]
//! ```
//!
//! # Design
//!
//! - **One lock per operation** - state, queues and flow controller live
//!   behind the core's mutex; user code runs with it released.
//! - **Two processors** - `SimpleProcessor` runs on the delivering thread,
//!   `ThreadedProcessor` owns a worker thread.
//! - **Two-stage state machine** - committed state plus a pending request.
//! - **Events over channels** - state changes and errors are published to
//!   crossbeam subscribers.

pub mod engine;
pub mod error;
pub mod events;
pub mod flow;
pub mod id;
pub mod nodes;
pub mod operation;
pub mod port;
pub mod processor;
pub mod property;
pub mod state;

pub use engine::{ConnectionInfo, Engine};
pub use error::{ExecutionError, PipelineError, PipelineResult};
pub use events::{EventBus, OperationEvent};
pub use flow::{DefaultFlowController, FlowController, FlowState};
pub use id::{OperationId, PortId};
pub use operation::{CheckContext, Operation, OperationCore, OperationSettings, ProcessContext};
pub use port::{InputQueue, InputSet, OutputPort, PortDescriptor, PortDirection, PortWaker};
pub use processor::{Processor, ProcessorKind, SimpleProcessor, ThreadedProcessor};
pub use property::PropertySet;
pub use state::OperationState;
