//! Operation events delivered to subscribers over crossbeam channels.

use crate::pipeline::id::OperationId;
use crate::pipeline::state::OperationState;
use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

/// Notification published by an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationEvent {
    StateChanged {
        id: OperationId,
        name: String,
        from: OperationState,
        to: OperationState,
    },
    /// An execution error stopped the operation.
    Error {
        id: OperationId,
        name: String,
        message: String,
        at: DateTime<Utc>,
    },
}

impl OperationEvent {
    pub fn operation(&self) -> OperationId {
        match self {
            OperationEvent::StateChanged { id, .. } | OperationEvent::Error { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            OperationEvent::StateChanged { name, .. } | OperationEvent::Error { name, .. } => name,
        }
    }
}

/// Fan-out list of event senders. Disconnected subscribers are pruned on
/// the next publish.
#[derive(Debug, Default)]
pub struct EventBus {
    senders: Mutex<Vec<Sender<OperationEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<OperationEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.attach(tx);
        rx
    }

    /// Forwards events into an existing channel.
    pub fn attach(&self, sender: Sender<OperationEvent>) {
        self.senders.lock().push(sender);
    }

    pub fn publish(&self, event: OperationEvent) {
        let mut senders = self.senders.lock();
        senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().len()
    }
}
