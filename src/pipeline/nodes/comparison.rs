//! ComparisonOperation: compares numbers or numeric matrices.
//!
//! The left operand arrives on `input0`. The right operand is taken from
//! `input1` when it is connected, otherwise from the `constant` property.
//! Scalars produce a `bool`; matrices produce a `Matrix<bool>` compared
//! element by element (against a scalar or an equally sized matrix).

use super::numeric_as_f64;
use crate::pipeline::error::ExecutionError;
use crate::pipeline::operation::{CheckContext, Operation, ProcessContext};
use crate::pipeline::port::PortDescriptor;
use crate::variant::{Matrix, Variant};
use std::fmt;
use std::str::FromStr;

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("input0"),
    PortDescriptor::optional_input("input1"),
    PortDescriptor::output("output"),
];

/// Comparison applied by [`ComparisonOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareFunction {
    #[default]
    Equal,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

impl CompareFunction {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareFunction::Equal => "equal",
            CompareFunction::Less => "less",
            CompareFunction::Greater => "greater",
            CompareFunction::LessEqual => "less_equal",
            CompareFunction::GreaterEqual => "greater_equal",
        }
    }

    #[inline]
    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            CompareFunction::Equal => left == right,
            CompareFunction::Less => left < right,
            CompareFunction::Greater => left > right,
            CompareFunction::LessEqual => left <= right,
            CompareFunction::GreaterEqual => left >= right,
        }
    }
}

impl fmt::Display for CompareFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" => Ok(CompareFunction::Equal),
            "less" => Ok(CompareFunction::Less),
            "greater" => Ok(CompareFunction::Greater),
            "less_equal" => Ok(CompareFunction::LessEqual),
            "greater_equal" => Ok(CompareFunction::GreaterEqual),
            other => Err(format!("Unknown comparison function '{}'", other)),
        }
    }
}

/// Right-hand operand after type dispatch.
enum Operand {
    Scalar(f64),
    Matrix(Matrix<f64>),
}

/// Widens a numeric matrix of any element type to `f64`.
fn matrix_as_f64(object: &Variant) -> Option<Matrix<f64>> {
    macro_rules! widen {
        ($($t:ty),* $(,)?) => {
            $(
                if let Some(matrix) = object.try_value_as::<Matrix<$t>>() {
                    return Some(matrix.map(|v| *v as f64));
                }
            )*
        };
    }
    widen!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
    None
}

fn operand(input: usize, object: &Variant) -> Result<Operand, ExecutionError> {
    if let Some(value) = numeric_as_f64(object) {
        return Ok(Operand::Scalar(value));
    }
    if let Some(matrix) = matrix_as_f64(object) {
        return Ok(Operand::Matrix(matrix));
    }
    Err(ExecutionError::unknown_type(input, object))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonOperation {
    function: CompareFunction,
    constant: f64,
}

impl ComparisonOperation {
    pub fn new(function: CompareFunction, constant: f64) -> Self {
        Self { function, constant }
    }

    pub fn function(&self) -> CompareFunction {
        self.function
    }
}

impl Default for ComparisonOperation {
    fn default() -> Self {
        Self::new(CompareFunction::Equal, 0.0)
    }
}

impl Operation for ComparisonOperation {
    fn name(&self) -> &str {
        "Comparison"
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn check(&mut self, ctx: &CheckContext) -> Result<(), ExecutionError> {
        if !ctx.is_connected(1) && self.constant.is_nan() {
            return Err(ExecutionError::error("constant must be a number when input1 is not connected"));
        }
        Ok(())
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        let function = self.function;
        let left = operand(0, ctx.input(0))?;
        let right = if ctx.is_connected(1) {
            operand(1, ctx.input(1))?
        } else {
            Operand::Scalar(self.constant)
        };

        match (left, right) {
            (Operand::Scalar(l), Operand::Scalar(r)) => ctx.emit(0, function.apply(l, r)),
            (Operand::Matrix(l), Operand::Scalar(r)) => ctx.emit(0, l.map(|v| function.apply(*v, r))),
            (Operand::Scalar(l), Operand::Matrix(r)) => ctx.emit(0, r.map(|v| function.apply(l, *v))),
            (Operand::Matrix(l), Operand::Matrix(r)) => {
                let result = l.zip_map(&r, |a, b| function.apply(*a, *b)).ok_or_else(|| {
                    ExecutionError::error(format!(
                        "Matrix sizes differ: {}x{} vs {}x{}",
                        l.rows(),
                        l.columns(),
                        r.rows(),
                        r.columns()
                    ))
                })?;
                ctx.emit(0, result)
            }
        }
    }

    fn set_property(&mut self, name: &str, value: &Variant) -> Result<(), ExecutionError> {
        match name {
            "function" => {
                let text = value
                    .try_value_as::<String>()
                    .ok_or_else(|| ExecutionError::error("'function' expects a string"))?;
                self.function = text.parse().map_err(ExecutionError::Error)?;
            }
            "constant" => {
                self.constant = value
                    .try_convert_to::<f64>()
                    .ok_or_else(|| ExecutionError::error("'constant' expects a number"))?;
            }
            _ => return Err(ExecutionError::error(format!("Comparison has no property '{}'", name))),
        }
        Ok(())
    }

    fn property(&self, name: &str) -> Option<Variant> {
        match name {
            "function" => Some(Variant::from(self.function.as_str())),
            "constant" => Some(Variant::new(self.constant)),
            _ => None,
        }
    }
}
