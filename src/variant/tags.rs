//! Control tags multiplexed into data channels.
//!
//! Tags are variants whose type id lies in the control block. Their payloads
//! are an `i32` level delta for synchronization tags, a zero `i32` for stop
//! and pause tags, a [`SocketState`] for resume tags and the property-set
//! name for reconfiguration tags.

use super::{TypeId, Variant};

/// Flow state carried by a resume tag so receivers can restore their flow
/// level after a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SocketState {
    pub flow_level: i32,
    pub delay: i32,
}

impl SocketState {
    pub const fn new(flow_level: i32, delay: i32) -> Self {
        Self { flow_level, delay }
    }
}

/// Opens a nested synchronization level.
pub fn start_tag() -> Variant {
    Variant::tagged(1i32, TypeId::SYNC_TAG)
}

/// Closes a nested synchronization level.
pub fn end_tag() -> Variant {
    Variant::tagged(-1i32, TypeId::SYNC_TAG)
}

pub fn stop_tag() -> Variant {
    Variant::tagged(0i32, TypeId::STOP_TAG)
}

pub fn pause_tag() -> Variant {
    Variant::tagged(0i32, TypeId::PAUSE_TAG)
}

pub fn resume_tag(state: SocketState) -> Variant {
    Variant::tagged(state, TypeId::RESUME_TAG)
}

/// Asks receivers to apply the named property set once the tag has passed
/// through all of their inputs.
pub fn reconfiguration_tag(property_set: impl Into<String>) -> Variant {
    Variant::tagged(property_set.into(), TypeId::RECONFIGURATION_TAG)
}
