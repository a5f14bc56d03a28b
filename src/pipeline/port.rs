//! Ports of an operation.
//!
//! Each operation declares its ports via a static `PortDescriptor` array.
//! At runtime every input becomes a bounded [`InputQueue`] and every output an
//! [`OutputPort`] that hands a copy of each emitted variant to the connected
//! inputs, waiting while a receiver is full.

use crate::pipeline::error::ExecutionError;
use crate::pipeline::operation::OperationCore;
use crate::variant::Variant;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

/// Static descriptor for an operation's port.
#[derive(Debug, Clone)]
pub struct PortDescriptor {
    pub name: &'static str,
    pub direction: PortDirection,
    /// Optional inputs may stay unconnected.
    pub optional: bool,
}

impl PortDescriptor {
    pub const fn input(name: &'static str) -> Self {
        Self {
            name,
            direction: PortDirection::Input,
            optional: false,
        }
    }

    pub const fn optional_input(name: &'static str) -> Self {
        Self {
            name,
            direction: PortDirection::Input,
            optional: true,
        }
    }

    pub const fn output(name: &'static str) -> Self {
        Self {
            name,
            direction: PortDirection::Output,
            optional: true,
        }
    }
}

/// Wakes emitters blocked on a full receiver.
///
/// Owned by an output port and registered with every input it feeds. The
/// generation counter lets an emitter detect a slot freed between its failed
/// delivery and its wait.
#[derive(Debug, Default)]
pub struct PortWaker {
    generation: Mutex<u64>,
    freed: Condvar,
}

impl PortWaker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    pub fn notify(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.freed.notify_all();
    }

    /// Blocks until the generation moves past `seen` or `timeout` elapses.
    pub fn wait_for_change(&self, seen: u64, timeout: Duration) {
        let mut generation = self.generation.lock();
        if *generation == seen {
            let _ = self.freed.wait_for(&mut generation, timeout);
        }
    }
}

/// Bounded FIFO behind one input port.
#[derive(Debug)]
pub struct InputQueue {
    name: &'static str,
    optional: bool,
    connected: bool,
    capacity: usize,
    queue: VecDeque<Variant>,
    current: Variant,
    wakers: Vec<Arc<PortWaker>>,
}

impl InputQueue {
    pub fn new(name: &'static str, optional: bool, capacity: usize) -> Self {
        Self {
            name,
            optional,
            connected: false,
            capacity: capacity.max(1),
            queue: VecDeque::with_capacity(capacity.max(1)),
            current: Variant::invalid(),
            wakers: Vec::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn can_accept(&self) -> bool {
        self.queue.len() < self.capacity
    }

    /// Queues `object`. Callers check [`InputQueue::can_accept`] first.
    pub fn push(&mut self, object: Variant) {
        self.queue.push_back(object);
    }

    /// Object at the head of the queue.
    #[inline]
    pub fn head(&self) -> Option<&Variant> {
        self.queue.front()
    }

    /// Moves the head into the current slot. Returns `false` when empty.
    pub fn advance(&mut self) -> bool {
        let was_full = !self.can_accept();
        match self.queue.pop_front() {
            Some(object) => {
                self.current = object;
                if was_full {
                    for waker in &self.wakers {
                        waker.notify();
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Object selected for the cycle being prepared.
    #[inline]
    pub fn current(&self) -> &Variant {
        &self.current
    }

    pub fn take_current(&mut self) -> Variant {
        std::mem::take(&mut self.current)
    }

    /// Drops queued and current objects and wakes blocked emitters.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.current = Variant::invalid();
        for waker in &self.wakers {
            waker.notify();
        }
    }

    pub(crate) fn connect(&mut self, waker: Arc<PortWaker>) {
        self.connected = true;
        self.wakers.push(waker);
    }
}

/// All inputs of one operation.
#[derive(Debug, Default)]
pub struct InputSet {
    inputs: Vec<InputQueue>,
}

impl InputSet {
    pub fn new(inputs: Vec<InputQueue>) -> Self {
        Self { inputs }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&InputQueue> {
        self.inputs.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut InputQueue> {
        self.inputs.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputQueue> {
        self.inputs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut InputQueue> {
        self.inputs.iter_mut()
    }

    pub fn connected(&self) -> impl Iterator<Item = &InputQueue> {
        self.inputs.iter().filter(|i| i.is_connected())
    }

    /// Whether any connected input has queued objects.
    pub fn has_pending(&self) -> bool {
        self.connected().any(|i| !i.is_empty())
    }

    pub fn connected_mut(&mut self) -> impl Iterator<Item = &mut InputQueue> {
        self.inputs.iter_mut().filter(|i| i.is_connected())
    }

    pub fn connected_count(&self) -> usize {
        self.connected().count()
    }

    /// An operation with no connected inputs produces data on its own.
    #[inline]
    pub fn is_source(&self) -> bool {
        self.inputs.iter().all(|i| !i.is_connected())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|i| i.name() == name)
    }

    /// Moves every current object out, leaving the slots empty.
    pub fn take_current(&mut self) -> Vec<Variant> {
        self.inputs.iter_mut().map(InputQueue::take_current).collect()
    }

    pub fn clear(&mut self) {
        for input in &mut self.inputs {
            input.clear();
        }
    }
}

/// A link from an output port to one input of another operation.
pub(crate) struct Connection {
    pub target: Arc<OperationCore>,
    pub input: usize,
}

/// Output port: fans emitted objects out to every connected input.
pub struct OutputPort {
    name: &'static str,
    connections: Vec<Connection>,
    waker: Arc<PortWaker>,
}

impl OutputPort {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            connections: Vec::new(),
            waker: Arc::new(PortWaker::new()),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub(crate) fn waker(&self) -> Arc<PortWaker> {
        Arc::clone(&self.waker)
    }

    pub(crate) fn add_connection(&mut self, target: Arc<OperationCore>, input: usize) {
        self.connections.push(Connection { target, input });
    }

    /// Delivers `object` to each connection in order.
    ///
    /// A full receiver is retried every time it frees a slot, or at least
    /// every `retry`. Fails with `Interrupted` once `owner` is interrupted.
    pub(crate) fn emit(
        &self,
        owner: &OperationCore,
        object: &Variant,
        retry: Duration,
    ) -> Result<(), ExecutionError> {
        for connection in &self.connections {
            loop {
                let seen = self.waker.generation();
                if connection.target.try_accept(connection.input, object) {
                    break;
                }
                if owner.is_interrupted() {
                    return Err(ExecutionError::Interrupted);
                }
                tracing::trace!(
                    "{}.{} waiting for {} to free input {}",
                    owner.name(),
                    self.name,
                    connection.target.name(),
                    connection.input
                );
                self.waker.wait_for_change(seen, retry);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputPort")
            .field("name", &self.name)
            .field("connections", &self.connections.len())
            .finish()
    }
}
