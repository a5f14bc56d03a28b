//! Cooperative processor.
//!
//! No thread of its own: cycles run on whichever thread delivers input. A
//! source runs exactly one production step per `start()`.

use super::{dispatch, pause_protocol, reconfigure_source, resume_protocol, stop_protocol, Cycle};
use crate::pipeline::error::{ExecutionError, PipelineResult};
use crate::pipeline::operation::{OperationCore, Shared};
use crate::pipeline::state::{Committed, OperationState, Request};
use crate::variant::Variant;
use parking_lot::MutexGuard;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct SimpleProcessor;

impl SimpleProcessor {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn try_accept(&self, core: &OperationCore, input: usize, object: &Variant) -> bool {
        let mut shared = core.lock();
        if !shared.reset {
            tracing::trace!("{}: not reset, discarding {}", core.name(), object.type_id());
            return true;
        }
        if matches!(shared.state.committed(), Committed::Stopped | Committed::Paused) {
            core.commit(&mut shared, Committed::Running);
        }

        let Some(queue) = shared.inputs.get_mut(input) else {
            tracing::warn!("{}: no input {}", core.name(), input);
            return true;
        };
        if !queue.can_accept() {
            return false;
        }
        queue.push(object.clone());
        if shared.processing {
            return true;
        }

        shared.processing = true;
        let result = Self::drain(core, &mut shared);
        shared.processing = false;
        self.finish(core, &mut shared, result);
        true
    }

    fn drain(core: &OperationCore, shared: &mut MutexGuard<'_, Shared>) -> Result<(), ExecutionError> {
        while shared.reset && !shared.state.is_interrupted() {
            let Some(cycle) = shared.next_cycle()? else {
                break;
            };
            MutexGuard::unlocked(shared, || dispatch(core, cycle))?;
        }
        Ok(())
    }

    /// Turns the outcome of a cycle loop into a state change.
    fn finish(&self, core: &OperationCore, shared: &mut Shared, result: Result<(), ExecutionError>) {
        match result {
            Ok(()) => {}
            Err(ExecutionError::Paused) => {
                if !matches!(
                    shared.state.committed(),
                    Committed::Stopped | Committed::Interrupted
                ) {
                    core.commit(shared, Committed::Paused);
                }
            }
            Err(signal) => {
                if signal.is_failure() {
                    core.report(signal.to_string());
                }
                shared.reset = false;
                core.commit(shared, Committed::Stopped);
            }
        }
        if shared.state.is_interrupted() {
            core.commit(shared, Committed::Stopped);
        }
    }

    pub(crate) fn start(&self, core: &OperationCore) -> PipelineResult<()> {
        let mut shared = core.lock();
        let state = shared.state.state();
        let source = shared.inputs.is_source();
        match state {
            OperationState::Pausing | OperationState::Interrupted => return Ok(()),
            OperationState::Paused if !source => return Ok(()),
            _ => core.commit(&mut shared, Committed::Running),
        }
        if !source || !shared.reset || shared.processing {
            return Ok(());
        }

        let resumed = state == OperationState::Paused;
        let inputs = shared.inputs.len();
        shared.processing = true;
        let result = MutexGuard::unlocked(&mut shared, || {
            if resumed {
                resume_protocol(core, None)?;
            }
            dispatch(core, Cycle::source(inputs))
        });
        shared.processing = false;
        self.finish(core, &mut shared, result);
        Ok(())
    }

    pub(crate) fn pause(&self, core: &OperationCore) {
        self.end(core, Request::Pause);
    }

    pub(crate) fn stop(&self, core: &OperationCore) {
        self.end(core, Request::Stop);
    }

    /// Pause or stop. Connected operations wait for the matching tag;
    /// sources run the protocol at once.
    fn end(&self, core: &OperationCore, request: Request) {
        let mut shared = core.lock();
        if shared.state.state() != OperationState::Running {
            tracing::debug!("{}: ignoring {:?} in state {}", core.name(), request, shared.state.state());
            return;
        }
        if !shared.inputs.is_source() {
            core.request(&mut shared, request);
            return;
        }

        let result = match request {
            Request::Pause => {
                core.commit(&mut shared, Committed::Paused);
                MutexGuard::unlocked(&mut shared, || pause_protocol(core, None))
            }
            _ => {
                shared.reset = false;
                core.commit(&mut shared, Committed::Stopped);
                MutexGuard::unlocked(&mut shared, || stop_protocol(core, None))
            }
        };
        match result {
            Ok(()) | Err(ExecutionError::Paused) | Err(ExecutionError::Finished) => {}
            Err(signal) => self.finish(core, &mut shared, Err(signal)),
        }
    }

    pub(crate) fn interrupt(&self, core: &OperationCore) {
        let mut shared = core.lock();
        if shared.state.state() == OperationState::Stopped {
            return;
        }
        shared.reset = false;
        // An in-flight cycle acknowledges the interrupt when it returns.
        if shared.processing {
            core.commit(&mut shared, Committed::Interrupted);
        } else {
            core.commit(&mut shared, Committed::Stopped);
        }
    }

    pub(crate) fn reconfigure(&self, core: &OperationCore, property_set: &str) {
        if core.is_source() {
            reconfigure_source(core, property_set);
        } else {
            tracing::debug!(
                "{}: '{}' will apply when the reconfiguration tag arrives",
                core.name(),
                property_set
            );
        }
    }

    pub(crate) fn wait(&self, core: &OperationCore, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut shared = core.lock();
        while shared.state.state() != OperationState::Stopped {
            if core.condition().wait_until(&mut shared, deadline).timed_out() {
                return shared.state.state() == OperationState::Stopped;
            }
        }
        true
    }
}
