//! Flow control: deciding when an operation has a complete cycle to run.

use crate::pipeline::error::ExecutionError;
use crate::pipeline::port::InputSet;
use crate::variant::{SocketState, TypeId, Variant};

/// Outcome of [`FlowController::prepare_process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Not enough input yet. Ends the cycle loop.
    Incomplete,
    /// Data objects are selected in the inputs' current slots.
    Processable,
    /// A synchronization tag passed through every input.
    Synchronized,
    /// A reconfiguration tag passed through every input.
    Reconfigurable,
    Paused,
    Finished,
    Resumed,
}

/// Decides, from the heads of an operation's input queues, what the next
/// cycle should do.
///
/// Called with the operation's state lock held. Implementations move the
/// objects of the chosen cycle into the inputs' current slots.
pub trait FlowController: Send {
    fn prepare_process(&mut self, inputs: &mut InputSet) -> Result<FlowState, ExecutionError>;

    /// Synchronization group whose objects were selected.
    fn active_input_group(&self) -> i32 {
        0
    }

    /// Property set named by the last reconfiguration tag. Only meaningful
    /// after `Reconfigurable`.
    fn property_set_name(&self) -> Option<&str> {
        None
    }

    fn reset(&mut self) {}
}

/// Treats every connected input as one synchronization group.
///
/// A cycle is ready once each connected input has an object at its head. All
/// heads must be data, or all must be tags of the same kind.
#[derive(Debug, Default)]
pub struct DefaultFlowController {
    flow_level: i32,
    property_set: Option<String>,
}

impl DefaultFlowController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nesting depth of synchronization tags.
    #[inline]
    pub fn flow_level(&self) -> i32 {
        self.flow_level
    }

    fn consume(inputs: &mut InputSet) {
        for input in inputs.connected_mut() {
            input.advance();
        }
    }
}

impl FlowController for DefaultFlowController {
    fn prepare_process(&mut self, inputs: &mut InputSet) -> Result<FlowState, ExecutionError> {
        let mut heads = Vec::with_capacity(inputs.len());
        for input in inputs.connected() {
            match input.head() {
                Some(head) => heads.push((input.name(), head.type_id())),
                None => return Ok(FlowState::Incomplete),
            }
        }
        let Some(&(_, first)) = heads.first() else {
            return Ok(FlowState::Incomplete);
        };

        if heads.iter().all(|(_, t)| !t.is_control()) {
            Self::consume(inputs);
            return Ok(FlowState::Processable);
        }

        if let Some((name, other)) = heads.iter().find(|(_, t)| *t != first) {
            return Err(ExecutionError::error(format!(
                "synchronization error: input '{}' holds {} while '{}' holds {}",
                heads[0].0, first, name, other
            )));
        }

        Self::consume(inputs);
        let tag = inputs
            .connected()
            .next()
            .map(|input| input.current().clone())
            .unwrap_or_else(Variant::invalid);

        let state = match first {
            TypeId::SYNC_TAG => {
                self.flow_level += tag.try_value_as::<i32>().copied().unwrap_or(0);
                FlowState::Synchronized
            }
            TypeId::STOP_TAG => FlowState::Finished,
            TypeId::PAUSE_TAG => FlowState::Paused,
            TypeId::RESUME_TAG => {
                if let Some(state) = tag.try_value_as::<SocketState>() {
                    self.flow_level = state.flow_level;
                }
                FlowState::Resumed
            }
            TypeId::RECONFIGURATION_TAG => {
                self.property_set = tag.try_value_as::<String>().cloned();
                FlowState::Reconfigurable
            }
            other => {
                return Err(ExecutionError::error(format!(
                    "synchronization error: unsupported control object {}",
                    other
                )))
            }
        };
        tracing::trace!("flow level {} after {:?}", self.flow_level, state);
        Ok(state)
    }

    fn property_set_name(&self) -> Option<&str> {
        self.property_set.as_deref()
    }

    fn reset(&mut self) {
        self.flow_level = 0;
        self.property_set = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::port::{InputQueue, PortWaker};
    use crate::variant::tags;
    use std::sync::Arc;

    fn inputs(count: usize) -> InputSet {
        let mut queues = Vec::new();
        for name in ["a", "b", "c"].into_iter().take(count) {
            let mut q = InputQueue::new(name, false, 4);
            q.connect(Arc::new(PortWaker::new()));
            queues.push(q);
        }
        InputSet::new(queues)
    }

    #[test]
    fn test_incomplete_until_all_inputs_have_data() {
        let mut set = inputs(2);
        let mut flow = DefaultFlowController::new();
        set.get_mut(0).unwrap().push(Variant::new(1i32));
        assert_eq!(flow.prepare_process(&mut set), Ok(FlowState::Incomplete));

        set.get_mut(1).unwrap().push(Variant::new(2i32));
        assert_eq!(flow.prepare_process(&mut set), Ok(FlowState::Processable));
        assert_eq!(set.get(0).unwrap().current(), &Variant::new(1i32));
        assert_eq!(set.get(1).unwrap().current(), &Variant::new(2i32));
        assert!(set.get(0).unwrap().is_empty());
    }

    #[test]
    fn test_unconnected_inputs_are_ignored() {
        let mut queues = vec![InputQueue::new("a", false, 4), InputQueue::new("b", true, 4)];
        queues[0].connect(Arc::new(PortWaker::new()));
        let mut set = InputSet::new(queues);
        set.get_mut(0).unwrap().push(Variant::new(3u8));
        let mut flow = DefaultFlowController::new();
        assert_eq!(flow.prepare_process(&mut set), Ok(FlowState::Processable));
    }

    #[test]
    fn test_tags_map_to_flow_states() {
        let mut flow = DefaultFlowController::new();
        let cases = [
            (tags::start_tag(), FlowState::Synchronized),
            (tags::end_tag(), FlowState::Synchronized),
            (tags::pause_tag(), FlowState::Paused),
            (tags::resume_tag(SocketState::new(0, 0)), FlowState::Resumed),
            (tags::stop_tag(), FlowState::Finished),
        ];
        for (tag, expected) in cases {
            let mut set = inputs(2);
            set.get_mut(0).unwrap().push(tag.clone());
            set.get_mut(1).unwrap().push(tag.clone());
            assert_eq!(flow.prepare_process(&mut set), Ok(expected));
            assert_eq!(set.get(0).unwrap().current(), &tag);
        }
    }

    #[test]
    fn test_flow_level_tracking() {
        let mut flow = DefaultFlowController::new();
        let mut set = inputs(1);
        set.get_mut(0).unwrap().push(tags::start_tag());
        set.get_mut(0).unwrap().push(tags::start_tag());
        flow.prepare_process(&mut set).unwrap();
        flow.prepare_process(&mut set).unwrap();
        assert_eq!(flow.flow_level(), 2);

        set.get_mut(0).unwrap().push(tags::resume_tag(SocketState::new(5, 0)));
        flow.prepare_process(&mut set).unwrap();
        assert_eq!(flow.flow_level(), 5);

        flow.reset();
        assert_eq!(flow.flow_level(), 0);
    }

    #[test]
    fn test_reconfiguration_name() {
        let mut flow = DefaultFlowController::new();
        let mut set = inputs(1);
        set.get_mut(0).unwrap().push(tags::reconfiguration_tag("night"));
        assert_eq!(flow.prepare_process(&mut set), Ok(FlowState::Reconfigurable));
        assert_eq!(flow.property_set_name(), Some("night"));
        flow.reset();
        assert_eq!(flow.property_set_name(), None);
    }

    #[test]
    fn test_mixed_heads_are_a_synchronization_error() {
        let mut flow = DefaultFlowController::new();
        let mut set = inputs(2);
        set.get_mut(0).unwrap().push(Variant::new(1i32));
        set.get_mut(1).unwrap().push(tags::stop_tag());
        match flow.prepare_process(&mut set) {
            Err(ExecutionError::Error(message)) => {
                assert!(message.starts_with("synchronization error"))
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut set = inputs(2);
        set.get_mut(0).unwrap().push(tags::pause_tag());
        set.get_mut(1).unwrap().push(tags::stop_tag());
        assert!(flow.prepare_process(&mut set).is_err());
    }
}
