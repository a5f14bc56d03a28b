//! Processor with one dedicated worker thread per operation.
//!
//! The worker blocks on the operation's condition variable while waiting
//! for input or while paused. External calls only record intents and signal
//! the condition; every committed transition after `Starting` is made by the
//! worker itself, except `Interrupted`.

use super::{dispatch, pause_protocol, reconfigure_source, resume_protocol, stop_protocol, Cycle};
use crate::pipeline::error::{ExecutionError, PipelineError, PipelineResult};
use crate::pipeline::operation::{OperationCore, Shared};
use crate::pipeline::state::{Committed, OperationState, Request};
use crate::variant::Variant;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct ThreadedProcessor {
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadedProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn start(&self, core: &Arc<OperationCore>) -> PipelineResult<()> {
        let mut worker = self.worker.lock();
        if core.state() == OperationState::Stopped {
            if let Some(previous) = worker.take() {
                if previous.join().is_err() {
                    tracing::warn!("Previous worker of {} panicked", core.name());
                }
            }
        }

        let mut shared = core.lock();
        match shared.state.state() {
            OperationState::Stopped => {
                core.request(&mut shared, Request::Start);
                shared.worker_alive = true;
                drop(shared);

                let runner = Arc::clone(core);
                let spawned = thread::Builder::new()
                    .name(core.name().to_owned())
                    .spawn(move || run(&runner));
                match spawned {
                    Ok(handle) => *worker = Some(handle),
                    Err(source) => {
                        let mut shared = core.lock();
                        shared.worker_alive = false;
                        core.commit(&mut shared, Committed::Stopped);
                        return Err(PipelineError::Spawn {
                            operation: core.name().to_owned(),
                            source,
                        });
                    }
                }
            }
            OperationState::Paused => core.request(&mut shared, Request::Start),
            state => tracing::debug!("{}: start ignored in state {}", core.name(), state),
        }
        Ok(())
    }

    pub(crate) fn pause(&self, core: &OperationCore) {
        self.request(core, Request::Pause);
    }

    pub(crate) fn stop(&self, core: &OperationCore) {
        self.request(core, Request::Stop);
    }

    fn request(&self, core: &OperationCore, request: Request) {
        let mut shared = core.lock();
        if shared.state.state() == OperationState::Running {
            core.request(&mut shared, request);
        } else {
            tracing::debug!("{}: ignoring {:?} in state {}", core.name(), request, shared.state.state());
        }
    }

    pub(crate) fn interrupt(&self, core: &OperationCore) {
        let mut shared = core.lock();
        if shared.state.state() != OperationState::Stopped {
            core.commit(&mut shared, Committed::Interrupted);
        }
    }

    pub(crate) fn reconfigure(&self, core: &OperationCore, property_set: &str) {
        let mut shared = core.lock();
        if shared.inputs.is_source() {
            shared.pending_property_set = Some(property_set.to_owned());
            core.condition().notify_all();
        }
    }

    pub(crate) fn try_accept(&self, core: &OperationCore, input: usize, object: &Variant) -> bool {
        let mut shared = core.lock();
        let Some(queue) = shared.inputs.get_mut(input) else {
            tracing::warn!("{}: no input {}", core.name(), input);
            return true;
        };
        if !queue.can_accept() {
            return false;
        }
        queue.push(object.clone());
        shared.wake_pending = true;
        core.condition().notify_all();
        true
    }

    /// Waits for the worker to exit, then joins it.
    pub(crate) fn wait(&self, core: &OperationCore, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        {
            let mut shared = core.lock();
            while shared.worker_alive {
                if core.condition().wait_until(&mut shared, deadline).timed_out() && shared.worker_alive {
                    return false;
                }
            }
        }
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                tracing::warn!("Worker of {} panicked", core.name());
            }
        }
        true
    }
}

/// Commits `Stopped` when the worker leaves `run`, including on panic.
struct WorkerExit<'a>(&'a OperationCore);

impl Drop for WorkerExit<'_> {
    fn drop(&mut self) {
        let core = self.0;
        let mut shared = core.lock();
        shared.worker_alive = false;
        shared.wake_pending = false;
        core.commit(&mut shared, Committed::Stopped);
        tracing::info!("Worker for {} exited", core.name());
    }
}

fn run(core: &OperationCore) {
    let _exit = WorkerExit(core);
    let mut shared = core.lock();
    if shared.state.committed() == Committed::Stopped {
        core.commit(&mut shared, Committed::Running);
    }
    tracing::info!("Worker for {} started", core.name());

    let signal = loop {
        if shared.state.is_interrupted() {
            break ExecutionError::Interrupted;
        }
        let step = if shared.inputs.is_source() {
            source_step(core, &mut shared)
        } else {
            connected_step(core, &mut shared)
        };
        let step = match step {
            Err(ExecutionError::Paused) if !shared.state.is_interrupted() => suspend(core, &mut shared),
            other => other,
        };
        if let Err(signal) = step {
            break signal;
        }
    };

    if signal.is_failure() {
        core.report(signal.to_string());
    }
    tracing::debug!("{}: worker leaving on {:?}", core.name(), signal);
}

/// Waits for input, then runs cycles until the flow controller reports
/// incomplete input.
fn connected_step(core: &OperationCore, shared: &mut MutexGuard<'_, Shared>) -> Result<(), ExecutionError> {
    while !shared.wake_pending && !shared.state.is_interrupted() {
        core.condition().wait(shared);
    }
    shared.wake_pending = false;

    while !shared.state.is_interrupted() {
        let Some(cycle) = shared.next_cycle()? else {
            break;
        };
        MutexGuard::unlocked(shared, || dispatch(core, cycle))?;
    }
    Ok(())
}

/// One production step, then pending reconfiguration, then any pause or
/// stop intent.
fn source_step(core: &OperationCore, shared: &mut MutexGuard<'_, Shared>) -> Result<(), ExecutionError> {
    let cycle = Cycle::source(shared.inputs.len());
    MutexGuard::unlocked(shared, || dispatch(core, cycle))?;

    if let Some(name) = shared.pending_property_set.take() {
        MutexGuard::unlocked(shared, || reconfigure_source(core, &name));
    }

    match shared.state.requested() {
        Some(Request::Pause) => MutexGuard::unlocked(shared, || pause_protocol(core, None)),
        Some(Request::Stop) => MutexGuard::unlocked(shared, || stop_protocol(core, None)),
        _ => Ok(()),
    }
}

/// Parks the worker in `Paused` until started again or interrupted.
/// Connected operations also wake when input arrives; a resume tag then
/// runs `operation_resumed` through the normal cycle loop.
fn suspend(core: &OperationCore, shared: &mut MutexGuard<'_, Shared>) -> Result<(), ExecutionError> {
    core.commit(shared, Committed::Paused);
    loop {
        if shared.state.is_interrupted() {
            return Err(ExecutionError::Interrupted);
        }
        if shared.state.requested() == Some(Request::Start) {
            break;
        }
        // Queued objects, not `wake_pending`: that flag may still be set by
        // input consumed before the pause.
        if !shared.inputs.is_source() && shared.inputs.has_pending() {
            tracing::debug!("{}: input arrived while paused, resuming", core.name());
            break;
        }
        core.condition().wait(shared);
    }

    if shared.inputs.is_source() {
        if let Some(name) = shared.pending_property_set.take() {
            MutexGuard::unlocked(shared, || reconfigure_source(core, &name));
        }
        MutexGuard::unlocked(shared, || resume_protocol(core, None))?;
    } else {
        // Drain whatever queued up while paused.
        shared.wake_pending = true;
    }

    if shared.state.committed() == Committed::Paused {
        core.commit(shared, Committed::Running);
    }
    Ok(())
}
