//! CounterSource: emits an arithmetic sequence of `i32` values.
//!
//! One value per production step. With a `limit`, the source finishes after
//! that many values, which ends the stream downstream with a stop tag.

use crate::pipeline::error::ExecutionError;
use crate::pipeline::operation::{CheckContext, Operation, ProcessContext};
use crate::pipeline::port::PortDescriptor;
use crate::variant::Variant;
use std::time::Duration;

static PORTS: &[PortDescriptor] = &[PortDescriptor::output("output")];

/// Counter source. Properties: `start`, `step`, `limit` (0 = endless) and
/// `interval_ms` (delay after each value).
#[derive(Debug, Clone)]
pub struct CounterSource {
    start: i32,
    step: i32,
    limit: Option<u32>,
    interval: Option<Duration>,
    next: i32,
    emitted: u32,
}

impl CounterSource {
    pub fn new() -> Self {
        Self {
            start: 0,
            step: 1,
            limit: None,
            interval: None,
            next: 0,
            emitted: 0,
        }
    }

    pub fn with_start(mut self, start: i32) -> Self {
        self.start = start;
        self.next = start;
        self
    }

    pub fn with_step(mut self, step: i32) -> Self {
        self.step = step;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = (!interval.is_zero()).then_some(interval);
        self
    }

    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl Default for CounterSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Operation for CounterSource {
    fn name(&self) -> &str {
        "CounterSource"
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn check(&mut self, ctx: &CheckContext) -> Result<(), ExecutionError> {
        if self.step == 0 {
            return Err(ExecutionError::error("step must not be zero"));
        }
        if ctx.reset() {
            self.next = self.start;
            self.emitted = 0;
        }
        Ok(())
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        if self.limit.is_some_and(|limit| self.emitted >= limit) {
            return Err(ExecutionError::Finished);
        }
        ctx.emit(0, self.next)?;
        self.next = self.next.wrapping_add(self.step);
        self.emitted += 1;
        if let Some(interval) = self.interval {
            std::thread::sleep(interval);
        }
        Ok(())
    }

    fn set_property(&mut self, name: &str, value: &Variant) -> Result<(), ExecutionError> {
        let number = value
            .try_convert_to::<i64>()
            .ok_or_else(|| ExecutionError::error(format!("'{}' expects a number, got {}", name, value.type_id())))?;
        match name {
            "start" => self.start = number as i32,
            "step" => self.step = number as i32,
            "limit" => self.limit = (number > 0).then_some(number as u32),
            "interval_ms" => {
                self.interval = (number > 0).then(|| Duration::from_millis(number as u64))
            }
            _ => return Err(ExecutionError::error(format!("CounterSource has no property '{}'", name))),
        }
        Ok(())
    }

    fn property(&self, name: &str) -> Option<Variant> {
        match name {
            "start" => Some(Variant::new(self.start)),
            "step" => Some(Variant::new(self.step)),
            "limit" => Some(Variant::new(self.limit.unwrap_or(0))),
            "interval_ms" => Some(Variant::new(
                self.interval.map(|d| d.as_millis() as u64).unwrap_or(0),
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties() {
        let mut source = CounterSource::new().with_start(5).with_limit(3);
        assert_eq!(source.property("start"), Some(Variant::new(5i32)));
        assert_eq!(source.property("limit"), Some(Variant::new(3u32)));

        source.set_property("step", &Variant::new(2.0f64)).unwrap();
        assert_eq!(source.property("step"), Some(Variant::new(2i32)));
        source.set_property("limit", &Variant::new(0i32)).unwrap();
        assert_eq!(source.property("limit"), Some(Variant::new(0u32)));

        assert!(source.set_property("bogus", &Variant::new(1i32)).is_err());
        assert!(source.set_property("step", &Variant::from("fast")).is_err());
        assert_eq!(source.property("bogus"), None);
    }
}
