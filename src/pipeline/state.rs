//! Operation state machine.
//!
//! The machine has two stages: a `committed` state that only the processor
//! moves between `Stopped`, `Running`, `Paused` and `Interrupted`, and an
//! optional `requested` transition recorded by external callers. The
//! intermediate states are derived from the pair:
//!
//! ```text
//! Stopped + Start  → Starting
//! Running + Pause  → Pausing
//! Running + Stop   → Stopping
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Externally visible state of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Stopped,
    Starting,
    Running,
    Pausing,
    Paused,
    Stopping,
    Interrupted,
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationState::Stopped => "Stopped",
            OperationState::Starting => "Starting",
            OperationState::Running => "Running",
            OperationState::Pausing => "Pausing",
            OperationState::Paused => "Paused",
            OperationState::Stopping => "Stopping",
            OperationState::Interrupted => "Interrupted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Committed {
    Stopped,
    Running,
    Paused,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Request {
    Start,
    Pause,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StateMachine {
    committed: Committed,
    requested: Option<Request>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            committed: Committed::Stopped,
            requested: None,
        }
    }

    pub fn state(&self) -> OperationState {
        match (self.committed, self.requested) {
            (Committed::Stopped, Some(Request::Start)) => OperationState::Starting,
            (Committed::Running, Some(Request::Pause)) => OperationState::Pausing,
            (Committed::Running, Some(Request::Stop)) => OperationState::Stopping,
            (Committed::Stopped, _) => OperationState::Stopped,
            (Committed::Running, _) => OperationState::Running,
            (Committed::Paused, _) => OperationState::Paused,
            (Committed::Interrupted, _) => OperationState::Interrupted,
        }
    }

    #[inline]
    pub fn committed(&self) -> Committed {
        self.committed
    }

    #[inline]
    pub fn requested(&self) -> Option<Request> {
        self.requested
    }

    #[inline]
    pub fn is_interrupted(&self) -> bool {
        self.committed == Committed::Interrupted
    }

    /// Commits `state` and drops any pending request.
    pub fn commit(&mut self, state: Committed) {
        self.committed = state;
        self.requested = None;
    }

    pub fn request(&mut self, request: Request) {
        self.requested = Some(request);
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
