//! Process-wide registries for variant conversion and type aliases.
//!
//! Converters are plain function pointers keyed by `(from, to)` type id
//! pairs. The default table converts between every numeric primitive and
//! `bool`, between chars and the other integer types, and between every
//! primitive and text.

use super::{TypeId, Variant, VariantValue};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

/// Converts a variant into a variant of another type. `None` means the
/// conversion failed.
pub type Converter = fn(&Variant) -> Option<Variant>;

type ConverterTable = HashMap<(TypeId, TypeId), Converter>;

static CONVERTERS: OnceLock<RwLock<ConverterTable>> = OnceLock::new();
static ALIASES: OnceLock<RwLock<HashMap<TypeId, TypeId>>> = OnceLock::new();

fn converters() -> &'static RwLock<ConverterTable> {
    CONVERTERS.get_or_init(|| RwLock::new(default_converters()))
}

fn aliases() -> &'static RwLock<HashMap<TypeId, TypeId>> {
    ALIASES.get_or_init(|| {
        RwLock::new(HashMap::from([
            (TypeId::SYNC_TAG, TypeId::INT),
            (TypeId::STOP_TAG, TypeId::INT),
            (TypeId::PAUSE_TAG, TypeId::INT),
            (TypeId::RESUME_TAG, TypeId::SOCKET_STATE),
            (TypeId::RECONFIGURATION_TAG, TypeId::STRING),
        ]))
    })
}

/// Looks up the converter registered for `(from, to)`.
pub fn converter(from: TypeId, to: TypeId) -> Option<Converter> {
    converters().read().get(&(from, to)).copied()
}

pub fn can_convert(from: TypeId, to: TypeId) -> bool {
    converters().read().contains_key(&(from, to))
}

/// Installs (`Some`) or removes (`None`) the converter for `(from, to)`.
/// Returns the previously registered converter.
pub fn set_converter(from: TypeId, to: TypeId, converter: Option<Converter>) -> Option<Converter> {
    let mut table = converters().write();
    match converter {
        Some(f) => table.insert((from, to), f),
        None => table.remove(&(from, to)),
    }
}

/// Allows values of type `natural` to be wrapped under the `alias` id with
/// [`Variant::with_type`].
pub fn register_type_alias(alias: TypeId, natural: TypeId) {
    let previous = aliases().write().insert(alias, natural);
    if let Some(previous) = previous.filter(|p| *p != natural) {
        tracing::warn!(
            "Type alias {} re-registered: {} replaced by {}",
            alias,
            previous,
            natural
        );
    }
}

/// Natural type registered for `alias`.
pub fn natural_type(alias: TypeId) -> Option<TypeId> {
    aliases().read().get(&alias).copied()
}

trait Cast<T> {
    fn cast(self) -> T;
}

macro_rules! cast_row {
    (@to $from:ty; $($to:ty),*) => {
        $(
            impl Cast<$to> for $from {
                #[inline]
                fn cast(self) -> $to {
                    self as $to
                }
            }
        )*
    };
    ($from:ty) => {
        cast_row!(@to $from; i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

        impl Cast<bool> for $from {
            #[inline]
            fn cast(self) -> bool {
                self != (0 as $from)
            }
        }

        impl Cast<$from> for bool {
            #[inline]
            fn cast(self) -> $from {
                (self as u8) as $from
            }
        }
    };
}

cast_row!(i8);
cast_row!(i16);
cast_row!(i32);
cast_row!(i64);
cast_row!(u8);
cast_row!(u16);
cast_row!(u32);
cast_row!(u64);
cast_row!(f32);
cast_row!(f64);

fn cast_converter<F, T>(variant: &Variant) -> Option<Variant>
where
    F: VariantValue + Copy + Cast<T>,
    T: VariantValue,
{
    variant
        .try_value_as::<F>()
        .map(|v| Variant::new(<F as Cast<T>>::cast(*v)))
}

fn format_converter<F>(variant: &Variant) -> Option<Variant>
where
    F: VariantValue + ToString,
{
    variant
        .try_value_as::<F>()
        .map(|v| Variant::new(v.to_string()))
}

fn parse_converter<T>(variant: &Variant) -> Option<Variant>
where
    T: VariantValue + FromStr,
{
    variant
        .try_value_as::<String>()?
        .trim()
        .parse::<T>()
        .ok()
        .map(Variant::new)
}

macro_rules! register_casts {
    ($table:ident, $from:ty => [$($to:ty),*]) => {
        $(
            $table.insert(
                (<$from as VariantValue>::TYPE_ID, <$to as VariantValue>::TYPE_ID),
                cast_converter::<$from, $to> as Converter,
            );
        )*
    };
}

macro_rules! register_text {
    ($table:ident, [$($ty:ty),*]) => {
        $(
            $table.insert(
                (<$ty as VariantValue>::TYPE_ID, TypeId::STRING),
                format_converter::<$ty> as Converter,
            );
            $table.insert(
                (TypeId::STRING, <$ty as VariantValue>::TYPE_ID),
                parse_converter::<$ty> as Converter,
            );
        )*
    };
}

fn default_converters() -> ConverterTable {
    let mut table = ConverterTable::new();

    register_casts!(table, i16 => [i8, i32, i64, u8, u16, u32, u64, f32, f64, bool]);
    register_casts!(table, i32 => [i8, i16, i64, u8, u16, u32, u64, f32, f64, bool]);
    register_casts!(table, i64 => [i8, i16, i32, u8, u16, u32, u64, f32, f64, bool]);
    register_casts!(table, u16 => [i8, i16, i32, i64, u8, u32, u64, f32, f64, bool]);
    register_casts!(table, u32 => [i8, i16, i32, i64, u8, u16, u64, f32, f64, bool]);
    register_casts!(table, u64 => [i8, i16, i32, i64, u8, u16, u32, f32, f64, bool]);
    register_casts!(table, f32 => [i16, i32, i64, u16, u32, u64, f64, bool]);
    register_casts!(table, f64 => [i16, i32, i64, u16, u32, u64, f32, bool]);
    // chars stay out of floating point
    register_casts!(table, i8 => [i16, i32, i64, u8, u16, u32, u64, bool]);
    register_casts!(table, u8 => [i8, i16, i32, i64, u16, u32, u64, bool]);
    register_casts!(table, bool => [i8, i16, i32, i64, u8, u16, u32, u64, f32, f64]);

    register_text!(table, [i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool]);

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_numeric_conversions() {
        assert_eq!(Variant::new(3i32).convert_to(0.0f64), 3.0);
        assert_eq!(Variant::new(2.9f64).convert_to(0i32), 2);
        assert_eq!(Variant::new(300u16).try_convert_to::<u64>(), Some(300));
        assert_eq!(Variant::new(-1i64).convert_to(0.0f32), -1.0);
    }

    #[test]
    fn test_bool_conversions() {
        assert_eq!(Variant::new(0u32).try_convert_to::<bool>(), Some(false));
        assert_eq!(Variant::new(0.5f32).try_convert_to::<bool>(), Some(true));
        assert_eq!(Variant::new(true).try_convert_to::<f64>(), Some(1.0));
        assert_eq!(Variant::new(true).try_convert_to::<i8>(), Some(1));
    }

    #[test]
    fn test_char_conversions_skip_floats() {
        assert_eq!(Variant::new(65u8).try_convert_to::<i32>(), Some(65));
        assert_eq!(Variant::new(-3i8).try_convert_to::<i16>(), Some(-3));
        assert_eq!(Variant::new(7i32).try_convert_to::<u8>(), Some(7));
        assert!(Variant::new(1u8).try_convert_to::<f32>().is_none());
        assert!(Variant::new(1.0f64).try_convert_to::<i8>().is_none());
        assert!(!can_convert(TypeId::CHAR, TypeId::DOUBLE));
    }

    #[test]
    fn test_text_conversions() {
        assert_eq!(Variant::new(12i32).try_convert_to::<String>(), Some("12".to_string()));
        assert_eq!(Variant::from(" 2.5 ").try_convert_to::<f64>(), Some(2.5));
        assert_eq!(Variant::from("true").try_convert_to::<bool>(), Some(true));
        assert!(Variant::from("twelve").try_convert_to::<i32>().is_none());
        assert_eq!(Variant::from("twelve").convert_to(-1i32), -1);
    }

    #[test]
    fn test_no_converter_for_matrices() {
        let m = Variant::new(crate::variant::Matrix::<u8>::new(1, 1));
        assert!(m.try_convert_to::<u8>().is_none());
        assert!(!m.can_convert_to(TypeId::UCHAR));
    }

    #[test]
    fn test_builtin_aliases() {
        assert_eq!(natural_type(TypeId::SYNC_TAG), Some(TypeId::INT));
        assert_eq!(natural_type(TypeId::RESUME_TAG), Some(TypeId::SOCKET_STATE));
        assert_eq!(natural_type(TypeId::RECONFIGURATION_TAG), Some(TypeId::STRING));
        assert_eq!(natural_type(TypeId::INT), None);
    }

    #[test]
    #[serial]
    fn test_custom_converter_install_and_remove() {
        fn halve(v: &Variant) -> Option<Variant> {
            v.try_value_as::<f64>().map(|x| Variant::new((x / 2.0) as i32))
        }
        let previous = set_converter(TypeId::DOUBLE, TypeId::INT, Some(halve));
        assert!(previous.is_some());
        assert_eq!(Variant::new(9.0f64).try_convert_to::<i32>(), Some(4));

        set_converter(TypeId::DOUBLE, TypeId::INT, previous);
        assert_eq!(Variant::new(9.0f64).try_convert_to::<i32>(), Some(9));
    }

    #[test]
    #[serial]
    fn test_custom_alias() {
        let alias = TypeId(0xe5);
        register_type_alias(alias, TypeId::DOUBLE);
        let v = Variant::with_type(1.25f64, alias);
        assert_eq!(v.type_id(), alias);
        assert_eq!(*v.value_as::<f64>(), 1.25);
    }

    proptest! {
        #[test]
        fn prop_int_to_text_and_back(x: i32) {
            let text = Variant::new(x).try_convert_to::<String>().unwrap();
            prop_assert_eq!(Variant::new(text).try_convert_to::<i32>(), Some(x));
        }

        #[test]
        fn prop_u16_widens_losslessly(x: u16) {
            prop_assert_eq!(Variant::new(x).try_convert_to::<i64>(), Some(x as i64));
            prop_assert_eq!(Variant::new(x).try_convert_to::<f64>(), Some(x as f64));
        }
    }
}
