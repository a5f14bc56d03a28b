//! ScaleOperation: multiplies numeric scalars by a constant factor.

use super::numeric_as_f64;
use crate::pipeline::error::ExecutionError;
use crate::pipeline::operation::{Operation, ProcessContext};
use crate::pipeline::port::PortDescriptor;
use crate::variant::Variant;

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("input"),
    PortDescriptor::output("output"),
];

/// Widens any numeric primitive input to `f64` and emits `value * factor`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleOperation {
    factor: f64,
}

impl ScaleOperation {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl Default for ScaleOperation {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Operation for ScaleOperation {
    fn name(&self) -> &str {
        "Scale"
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        let object = ctx.input(0);
        let value = numeric_as_f64(object).ok_or_else(|| ExecutionError::unknown_type(0, object))?;
        ctx.emit(0, value * self.factor)
    }

    fn set_property(&mut self, name: &str, value: &Variant) -> Result<(), ExecutionError> {
        match name {
            "factor" => {
                self.factor = value
                    .try_convert_to::<f64>()
                    .ok_or_else(|| ExecutionError::error(format!("'factor' expects a number, got {}", value.type_id())))?;
                Ok(())
            }
            _ => Err(ExecutionError::error(format!("Scale has no property '{}'", name))),
        }
    }

    fn property(&self, name: &str) -> Option<Variant> {
        (name == "factor").then(|| Variant::new(self.factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_property() {
        let mut scale = ScaleOperation::default();
        assert_eq!(scale.factor(), 1.0);
        scale.set_property("factor", &Variant::new(3i32)).unwrap();
        assert_eq!(scale.property("factor"), Some(Variant::new(3.0f64)));
        assert!(scale.set_property("factor", &Variant::from("x")).is_err());
        assert!(scale.set_property("offset", &Variant::new(1.0f64)).is_err());
    }
}
