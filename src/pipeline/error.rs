//! Pipeline-specific error types.

use crate::pipeline::port::PortDirection;
use crate::variant::{TypeId, Variant};
use thiserror::Error;

/// Signals raised by operation code and flow controllers while a cycle runs.
///
/// `Paused`, `Finished` and `Interrupted` become state transitions inside the
/// processor. `Error` and `UnknownType` are reported to listeners and stop the
/// operation. None of them propagate past the processor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// Recoverable suspension request.
    #[error("Operation paused")]
    Paused,

    /// Normal end of stream.
    #[error("Operation finished")]
    Finished,

    /// Cancellation observed while blocked.
    #[error("Operation interrupted")]
    Interrupted,

    #[error("{0}")]
    Error(String),

    #[error("Unknown type {type_id} in input {input}")]
    UnknownType { input: usize, type_id: TypeId },
}

impl ExecutionError {
    pub fn error(message: impl Into<String>) -> Self {
        ExecutionError::Error(message.into())
    }

    pub fn unknown_type(input: usize, object: &Variant) -> Self {
        ExecutionError::UnknownType {
            input,
            type_id: object.type_id(),
        }
    }

    /// Whether this signal must be reported to listeners.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ExecutionError::Error(_) | ExecutionError::UnknownType { .. }
        )
    }
}

/// Errors raised while building or driving an operation graph.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Operation {0:?} not found")]
    OperationNotFound(crate::pipeline::OperationId),

    #[error("Operation name '{0}' is already in use")]
    DuplicateName(String),

    #[error("Operation '{operation}' has no {direction} named '{port}'")]
    UnknownPort {
        operation: String,
        direction: PortDirection,
        port: String,
    },

    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    #[error("Cycle detected in operation graph")]
    CycleDetected,

    #[error("Operation '{0}' is not stopped")]
    NotStopped(String),

    #[error("Required input '{input}' of operation '{operation}' is not connected")]
    UnconnectedInput { operation: String, input: String },

    #[error("Check failed for operation '{operation}': {message}")]
    Check { operation: String, message: String },

    #[error("Failed to spawn worker for operation '{operation}': {source}")]
    Spawn {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation '{operation}' failed: {message}")]
    Execution { operation: String, message: String },

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Channel receive error")]
    ChannelRecv,
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
