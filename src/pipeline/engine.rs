//! Engine: owns an operation graph and drives it as a unit.
//!
//! Operations are stored in a flat `Vec` indexed by [`OperationId`].
//! Connections are validated when added (ports exist, no self-loops, no
//! cycles) and the topological order is recomputed with Kahn's algorithm
//! after every change.

use crate::config::{EngineConfig, ErrorHandling};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::events::OperationEvent;
use crate::pipeline::id::{OperationId, PortId};
use crate::pipeline::operation::{Operation, OperationCore};
use crate::pipeline::port::PortDirection;
use crate::pipeline::processor::ProcessorKind;
use crate::pipeline::state::OperationState;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A connection between an output and an input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub from: PortId,
    pub to: PortId,
}

/// Graph of operations started, paused, stopped and interrupted together.
pub struct Engine {
    config: EngineConfig,
    operations: Vec<Arc<OperationCore>>,
    connections: Vec<ConnectionInfo>,
    /// Topological order (sources first).
    order: Vec<usize>,
    subscribers: Vec<Sender<OperationEvent>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            operations: Vec::new(),
            connections: Vec::new(),
            order: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Graph building ──

    /// Adds an operation using the processor configured for `name`.
    pub fn add_operation(&mut self, name: &str, body: impl Operation + 'static) -> PipelineResult<OperationId> {
        let kind = self.config.processor_for(name);
        self.add_operation_with(name, body, kind)
    }

    pub fn add_operation_with(
        &mut self,
        name: &str,
        body: impl Operation + 'static,
        kind: ProcessorKind,
    ) -> PipelineResult<OperationId> {
        if self.find(name).is_some() {
            return Err(PipelineError::DuplicateName(name.to_string()));
        }
        let id = OperationId(self.operations.len() as u32);
        let core = OperationCore::new(id, name, Box::new(body), kind, self.config.settings_for(name));
        for sender in &self.subscribers {
            core.attach(sender.clone());
        }
        tracing::info!("Added operation '{}' ({}, {:?})", name, core.type_name(), kind);
        self.operations.push(core);
        self.recompute_order();
        Ok(id)
    }

    pub fn operation(&self, id: OperationId) -> Option<&Arc<OperationCore>> {
        self.operations.get(id.index())
    }

    pub fn find(&self, name: &str) -> Option<OperationId> {
        self.operations.iter().find(|op| op.name() == name).map(|op| op.id())
    }

    pub fn operations(&self) -> impl Iterator<Item = &Arc<OperationCore>> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn connections(&self) -> &[ConnectionInfo] {
        &self.connections
    }

    /// Topological order of operation ids, sources first.
    pub fn execution_order(&self) -> Vec<OperationId> {
        self.order.iter().map(|&i| OperationId(i as u32)).collect()
    }

    /// Connects `output` of `from` to `input` of `to`.
    pub fn connect(&mut self, from: OperationId, output: &str, to: OperationId, input: &str) -> PipelineResult<()> {
        let source = self.get(from)?;
        let target = self.get(to)?;

        let output_index = source.output_index(output).ok_or_else(|| PipelineError::UnknownPort {
            operation: source.name().to_string(),
            direction: PortDirection::Output,
            port: output.to_string(),
        })?;
        let input_index = target.input_index(input).ok_or_else(|| PipelineError::UnknownPort {
            operation: target.name().to_string(),
            direction: PortDirection::Input,
            port: input.to_string(),
        })?;

        if from == to {
            return Err(PipelineError::InvalidConnection(
                "Cannot connect an operation to itself".to_string(),
            ));
        }
        let to_port = PortId::new(to, input_index as u16);
        if self.connections.iter().any(|c| c.to == to_port) {
            return Err(PipelineError::InvalidConnection(format!(
                "Input '{}' of '{}' is already connected",
                input,
                target.name()
            )));
        }
        if self.would_create_cycle(from, to) {
            return Err(PipelineError::CycleDetected);
        }

        source.connect(output_index, &target, input_index)?;
        self.connections.push(ConnectionInfo {
            from: PortId::new(from, output_index as u16),
            to: to_port,
        });
        self.recompute_order();
        tracing::info!(
            "Connected {}.{} -> {}.{}",
            source.name(),
            output,
            target.name(),
            input
        );
        Ok(())
    }

    fn get(&self, id: OperationId) -> PipelineResult<Arc<OperationCore>> {
        self.operation(id)
            .cloned()
            .ok_or(PipelineError::OperationNotFound(id))
    }

    // ── Topological sort (Kahn's algorithm) ──

    fn recompute_order(&mut self) {
        let n = self.operations.len();
        let mut in_degree = vec![0u32; n];
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];

        for connection in &self.connections {
            let from = connection.from.operation().index();
            let to = connection.to.operation().index();
            if from < n && to < n {
                adj[from].push(to);
                in_degree[to] += 1;
            }
        }

        let mut queue: Vec<usize> = (0..n).rev().filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(op) = queue.pop() {
            order.push(op);
            for &next in &adj[op] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push(next);
                }
            }
        }

        if order.len() != n {
            tracing::warn!(
                "Operation graph has a cycle! Only {} of {} operations ordered.",
                order.len(),
                n
            );
        }
        self.order = order;
    }

    /// Check if adding a connection from `from` to `to` would create a cycle.
    fn would_create_cycle(&self, from: OperationId, to: OperationId) -> bool {
        // If `to` can reach `from` through existing connections, from->to closes a loop.
        let mut visited = vec![false; self.operations.len()];
        let mut stack = vec![to];

        while let Some(current) = stack.pop() {
            if current == from {
                return true;
            }
            let idx = current.index();
            if idx >= self.operations.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;

            for connection in &self.connections {
                if connection.from.operation() == current {
                    stack.push(connection.to.operation());
                }
            }
        }
        false
    }

    fn ordered(&self) -> impl DoubleEndedIterator<Item = &Arc<OperationCore>> {
        self.order.iter().map(move |&i| &self.operations[i])
    }

    fn sources(&self) -> impl Iterator<Item = &Arc<OperationCore>> {
        self.ordered().filter(|op| op.is_source())
    }

    // ── Control ──

    /// Validates every operation. With `reset`, prepares them for a new run.
    pub fn check(&self, reset: bool) -> PipelineResult<()> {
        for op in self.ordered() {
            op.check(reset)?;
        }
        Ok(())
    }

    /// Starts every operation, sinks first so that nothing is emitted into
    /// a stage that is not yet running. A fully stopped graph is checked and
    /// reset first.
    pub fn start(&self) -> PipelineResult<()> {
        if self.operations.iter().all(|op| op.state() == OperationState::Stopped) {
            self.check(true)?;
        }
        tracing::info!("Starting {} operations", self.operations.len());
        for op in self.ordered().rev() {
            op.start()?;
        }
        Ok(())
    }

    /// Pauses the sources. Pause tags carry the request downstream.
    pub fn pause(&self) {
        tracing::info!("Pausing engine");
        for op in self.sources() {
            op.pause();
        }
    }

    /// Stops the sources. Stop tags carry the request downstream.
    pub fn stop(&self) {
        tracing::info!("Stopping engine");
        for op in self.sources() {
            op.stop();
        }
    }

    pub fn interrupt(&self) {
        tracing::info!("Interrupting engine");
        for op in self.ordered() {
            op.interrupt();
        }
    }

    pub fn reconfigure(&self, property_set: &str) {
        tracing::info!("Reconfiguring engine with '{}'", property_set);
        for op in self.ordered() {
            op.reconfigure(property_set);
        }
    }

    /// Waits for every operation to stop. Returns `false` on timeout.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.ordered().all(|op| {
            let remaining = deadline.saturating_duration_since(Instant::now());
            op.wait(remaining)
        })
    }

    /// Common state of all operations, or `None` while they differ.
    pub fn state(&self) -> Option<OperationState> {
        let mut states = self.operations.iter().map(|op| op.state());
        let first = states.next().unwrap_or(OperationState::Stopped);
        states.all(|s| s == first).then_some(first)
    }

    /// Receiver for events of every current and future operation.
    pub fn subscribe(&mut self) -> Receiver<OperationEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        for op in &self.operations {
            op.attach(tx.clone());
        }
        self.subscribers.push(tx);
        rx
    }

    /// Consumes events until every operation has stopped.
    ///
    /// With [`ErrorHandling::StopAll`] the first error event interrupts the
    /// whole graph and is returned. With [`ErrorHandling::Isolate`] errors are
    /// logged and supervision continues.
    pub fn supervise(&self, events: &Receiver<OperationEvent>, timeout: Duration) -> PipelineResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.state() == Some(OperationState::Stopped) {
                tracing::info!("All operations stopped");
                return Ok(());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(PipelineError::Timeout("operations to stop".to_string()));
            }
            match events.recv_timeout(remaining.min(Duration::from_millis(100))) {
                Ok(OperationEvent::Error { name, message, .. }) => match self.config.engine.error_handling {
                    ErrorHandling::StopAll => {
                        tracing::warn!("'{}' failed, interrupting all operations", name);
                        self.interrupt();
                        self.wait(self.config.engine.wait_timeout());
                        return Err(PipelineError::Execution {
                            operation: name,
                            message,
                        });
                    }
                    ErrorHandling::Isolate => {
                        tracing::warn!("'{}' failed and stopped: {}", name, message);
                    }
                },
                Ok(OperationEvent::StateChanged { .. }) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(PipelineError::ChannelRecv),
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.interrupt();
        if !self.wait(self.config.engine.wait_timeout()) {
            tracing::warn!("Some operations did not stop before the engine was dropped");
        }
    }
}
