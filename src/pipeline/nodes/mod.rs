//! Built-in operations.

pub mod collector_sink;
pub mod comparison;
pub mod counter_source;
pub mod scale;

pub use collector_sink::{CollectorHandle, CollectorRecord, CollectorSink};
pub use comparison::{CompareFunction, ComparisonOperation};
pub use counter_source::CounterSource;
pub use scale::ScaleOperation;

use crate::variant::Variant;

/// Widens an integer or float primitive to `f64`. `bool` is not numeric.
pub(crate) fn numeric_as_f64(object: &Variant) -> Option<f64> {
    macro_rules! widen {
        ($($t:ty),* $(,)?) => {
            $(
                if let Some(value) = object.try_value_as::<$t>() {
                    return Some(*value as f64);
                }
            )*
        };
    }
    if !object.type_id().is_numeric() {
        return None;
    }
    widen!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_as_f64() {
        assert_eq!(numeric_as_f64(&Variant::new(7u8)), Some(7.0));
        assert_eq!(numeric_as_f64(&Variant::new(-3i8)), Some(-3.0));
        assert_eq!(numeric_as_f64(&Variant::new(u64::MAX)), Some(u64::MAX as f64));
        assert_eq!(numeric_as_f64(&Variant::new(0.5f32)), Some(0.5));
        assert_eq!(numeric_as_f64(&Variant::new(true)), None);
        assert_eq!(numeric_as_f64(&Variant::from("7")), None);
        assert_eq!(numeric_as_f64(&Variant::invalid()), None);
    }
}
