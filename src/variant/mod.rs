//! Tagged message envelope exchanged between operation ports.
//!
//! A [`Variant`] pairs a [`TypeId`] with a payload. Payloads up to eight bytes
//! (every primitive, small colors and complex numbers, socket states) are
//! stored inline in the envelope; larger ones (matrices, text,
//! `Complex<f64>`, `Color<f32>`) live in a single owned heap box. Cloning a
//! variant always yields an independent payload.
//!
//! ```
//! use visflow::variant::{TypeId, Variant};
//!
//! let v = Variant::new(42i32);
//! assert_eq!(v.type_id(), TypeId::INT);
//! assert_eq!(*v.value_as::<i32>(), 42);
//! assert_eq!(v.convert_to(0.0f64), 42.0);
//! ```

pub mod color;
pub mod convert;
pub mod matrix;
pub mod tags;
pub mod type_id;

pub use color::{Color, Color4};
pub use convert::{can_convert, converter, register_type_alias, set_converter, Converter};
pub use matrix::Matrix;
pub use rustfft::num_complex::Complex;
pub use tags::SocketState;
pub use type_id::TypeId;

/// Inline payload budget in bytes.
pub const INLINE_CAPACITY: usize = 8;

/// Payloads that do not fit the inline budget.
#[derive(Debug, Clone, PartialEq)]
pub enum HeapPayload {
    ColorF32(Color<f32>),
    ComplexF64(Complex<f64>),
    Text(String),
    MatrixI8(Matrix<i8>),
    MatrixI16(Matrix<i16>),
    MatrixI32(Matrix<i32>),
    MatrixI64(Matrix<i64>),
    MatrixU8(Matrix<u8>),
    MatrixU16(Matrix<u16>),
    MatrixU32(Matrix<u32>),
    MatrixU64(Matrix<u64>),
    MatrixF32(Matrix<f32>),
    MatrixF64(Matrix<f64>),
    MatrixBool(Matrix<bool>),
    MatrixColorU8(Matrix<Color<u8>>),
    MatrixColor4U8(Matrix<Color4<u8>>),
    MatrixColorU16(Matrix<Color<u16>>),
    MatrixColorF32(Matrix<Color<f32>>),
    MatrixComplexI32(Matrix<Complex<i32>>),
    MatrixComplexF32(Matrix<Complex<f32>>),
    MatrixComplexF64(Matrix<Complex<f64>>),
}

/// Storage form of a variant payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Empty,
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    ColorU8(Color<u8>),
    Color4U8(Color4<u8>),
    ColorU16(Color<u16>),
    ComplexI32(Complex<i32>),
    ComplexF32(Complex<f32>),
    SocketState(SocketState),
    Heap(Box<HeapPayload>),
}

impl Payload {
    #[inline]
    pub fn is_heap(&self) -> bool {
        matches!(self, Payload::Heap(_))
    }
}

/// A Rust type that can travel inside a [`Variant`].
pub trait VariantValue: Clone + Send + Sync + 'static {
    /// Natural type id of the value.
    const TYPE_ID: TypeId;

    fn into_payload(self) -> Payload;

    fn from_payload(payload: &Payload) -> Option<&Self>;
}

macro_rules! inline_value {
    ($($ty:ty => $variant:ident, $id:ident;)*) => {
        $(
            impl VariantValue for $ty {
                const TYPE_ID: TypeId = TypeId::$id;

                #[inline]
                fn into_payload(self) -> Payload {
                    Payload::$variant(self)
                }

                #[inline]
                fn from_payload(payload: &Payload) -> Option<&Self> {
                    match payload {
                        Payload::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Variant::new(value)
                }
            }
        )*
    };
}

macro_rules! heap_value {
    ($($ty:ty => $variant:ident, $id:ident;)*) => {
        $(
            impl VariantValue for $ty {
                const TYPE_ID: TypeId = TypeId::$id;

                #[inline]
                fn into_payload(self) -> Payload {
                    Payload::Heap(Box::new(HeapPayload::$variant(self)))
                }

                #[inline]
                fn from_payload(payload: &Payload) -> Option<&Self> {
                    match payload {
                        Payload::Heap(heap) => match heap.as_ref() {
                            HeapPayload::$variant(v) => Some(v),
                            _ => None,
                        },
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Variant::new(value)
                }
            }
        )*
    };
}

inline_value! {
    i8 => I8, CHAR;
    i16 => I16, SHORT;
    i32 => I32, INT;
    i64 => I64, INT64;
    u8 => U8, UCHAR;
    u16 => U16, USHORT;
    u32 => U32, UINT;
    u64 => U64, UINT64;
    f32 => F32, FLOAT;
    f64 => F64, DOUBLE;
    bool => Bool, BOOL;
    Color<u8> => ColorU8, UCHAR_COLOR;
    Color4<u8> => Color4U8, UCHAR_COLOR4;
    Color<u16> => ColorU16, USHORT_COLOR;
    Complex<i32> => ComplexI32, INT_COMPLEX;
    Complex<f32> => ComplexF32, FLOAT_COMPLEX;
    SocketState => SocketState, SOCKET_STATE;
}

heap_value! {
    Color<f32> => ColorF32, FLOAT_COLOR;
    Complex<f64> => ComplexF64, DOUBLE_COMPLEX;
    String => Text, STRING;
    Matrix<i8> => MatrixI8, CHAR_MATRIX;
    Matrix<i16> => MatrixI16, SHORT_MATRIX;
    Matrix<i32> => MatrixI32, INT_MATRIX;
    Matrix<i64> => MatrixI64, INT64_MATRIX;
    Matrix<u8> => MatrixU8, UCHAR_MATRIX;
    Matrix<u16> => MatrixU16, USHORT_MATRIX;
    Matrix<u32> => MatrixU32, UINT_MATRIX;
    Matrix<u64> => MatrixU64, UINT64_MATRIX;
    Matrix<f32> => MatrixF32, FLOAT_MATRIX;
    Matrix<f64> => MatrixF64, DOUBLE_MATRIX;
    Matrix<bool> => MatrixBool, BOOL_MATRIX;
    Matrix<Color<u8>> => MatrixColorU8, UCHAR_COLOR_MATRIX;
    Matrix<Color4<u8>> => MatrixColor4U8, UCHAR_COLOR4_MATRIX;
    Matrix<Color<u16>> => MatrixColorU16, USHORT_COLOR_MATRIX;
    Matrix<Color<f32>> => MatrixColorF32, FLOAT_COLOR_MATRIX;
    Matrix<Complex<i32>> => MatrixComplexI32, INT_COMPLEX_MATRIX;
    Matrix<Complex<f32>> => MatrixComplexF32, FLOAT_COMPLEX_MATRIX;
    Matrix<Complex<f64>> => MatrixComplexF64, DOUBLE_COMPLEX_MATRIX;
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::new(value.to_string())
    }
}

/// Tagged, cloneable value envelope.
///
/// The type id and the storage form are fixed together at construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variant {
    type_id: TypeId,
    payload: Payload,
}

impl Variant {
    /// The empty envelope.
    pub const fn invalid() -> Self {
        Self {
            type_id: TypeId::INVALID,
            payload: Payload::Empty,
        }
    }

    /// Wraps `value` under its natural type id.
    #[inline]
    pub fn new<T: VariantValue>(value: T) -> Self {
        Self {
            type_id: T::TYPE_ID,
            payload: value.into_payload(),
        }
    }

    /// Wraps `value` under an explicit type id.
    ///
    /// # Panics
    ///
    /// Panics unless `type_id` is `T::TYPE_ID` or has been registered as an
    /// alias of it with [`register_type_alias`].
    pub fn with_type<T: VariantValue>(value: T, type_id: TypeId) -> Self {
        assert!(
            type_id == T::TYPE_ID || convert::natural_type(type_id) == Some(T::TYPE_ID),
            "type id {} is not registered as an alias of {}",
            type_id,
            T::TYPE_ID
        );
        Self::tagged(value, type_id)
    }

    /// Alias construction for ids known to be registered.
    #[inline]
    pub(crate) fn tagged<T: VariantValue>(value: T, type_id: TypeId) -> Self {
        Self {
            type_id,
            payload: value.into_payload(),
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.type_id.is_valid()
    }

    #[inline]
    pub fn is_primitive(&self) -> bool {
        self.type_id.is_primitive()
    }

    #[inline]
    pub fn is_integer(&self) -> bool {
        self.type_id.is_integer()
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        self.type_id.is_float()
    }

    #[inline]
    pub fn is_unsigned(&self) -> bool {
        self.type_id.is_unsigned()
    }

    #[inline]
    pub fn is_control(&self) -> bool {
        self.type_id.is_control()
    }

    #[inline]
    pub fn is_matrix(&self) -> bool {
        self.type_id.is_matrix()
    }

    #[inline]
    pub fn is_color(&self) -> bool {
        self.type_id.is_color()
    }

    #[inline]
    pub fn is_complex(&self) -> bool {
        self.type_id.is_complex()
    }

    /// Whether the payload is stored without a heap allocation.
    #[inline]
    pub fn is_inline(&self) -> bool {
        !self.payload.is_heap()
    }

    /// Returns the payload as `T`.
    ///
    /// Callers check [`Variant::type_id`] first; this is the fast path used by
    /// processing code that has already dispatched on the type.
    ///
    /// # Panics
    ///
    /// Panics if the payload is not a `T`.
    #[inline]
    pub fn value_as<T: VariantValue>(&self) -> &T {
        match T::from_payload(&self.payload) {
            Some(value) => value,
            None => panic!(
                "variant of type {} does not hold a value of type {}",
                self.type_id,
                T::TYPE_ID
            ),
        }
    }

    /// Checked form of [`Variant::value_as`].
    #[inline]
    pub fn try_value_as<T: VariantValue>(&self) -> Option<&T> {
        T::from_payload(&self.payload)
    }

    /// Converts the payload to `T`, returning `default` on failure.
    pub fn convert_to<T: VariantValue>(&self, default: T) -> T {
        self.try_convert_to().unwrap_or(default)
    }

    /// Converts the payload to `T` through the converter registry.
    ///
    /// A payload already stored as `T` is returned as is.
    pub fn try_convert_to<T: VariantValue>(&self) -> Option<T> {
        if let Some(value) = T::from_payload(&self.payload) {
            return Some(value.clone());
        }
        let convert = converter(self.type_id, T::TYPE_ID)?;
        let converted = convert(self)?;
        T::from_payload(&converted.payload).cloned()
    }

    /// Whether a converter from this variant's type to `to` is registered.
    pub fn can_convert_to(&self, to: TypeId) -> bool {
        self.type_id == to || can_convert(self.type_id, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_envelope_size() {
        assert!(std::mem::size_of::<Payload>() <= 2 * INLINE_CAPACITY);
        assert!(std::mem::size_of::<Variant>() <= 3 * INLINE_CAPACITY);
    }

    #[test]
    fn test_inline_and_heap_storage() {
        assert!(Variant::new(1u64).is_inline());
        assert!(Variant::new(Complex::new(1.0f32, 2.0)).is_inline());
        assert!(Variant::new(Color::new(1u16, 2, 3)).is_inline());
        assert!(Variant::new(SocketState::default()).is_inline());
        assert!(!Variant::new(Complex::new(1.0f64, 2.0)).is_inline());
        assert!(!Variant::new(String::from("text")).is_inline());
        assert!(!Variant::new(Matrix::<u8>::new(2, 2)).is_inline());
    }

    #[test]
    fn test_invalid_default() {
        let v = Variant::default();
        assert!(!v.is_valid());
        assert_eq!(v, Variant::invalid());
        assert!(v.try_value_as::<i32>().is_none());
    }

    #[test]
    fn test_clone_is_independent() {
        let original = Variant::new(Matrix::filled(2, 2, 1.5f64));
        let copy = original.clone();
        drop(original);
        assert_eq!(copy.value_as::<Matrix<f64>>()[(1, 1)], 1.5);
    }

    #[test]
    fn test_value_as_after_type_check() {
        let v = Variant::new(7u16);
        if v.type_id() == TypeId::USHORT {
            assert_eq!(*v.value_as::<u16>(), 7);
        }
        assert!(v.try_value_as::<i16>().is_none());
    }

    #[test]
    #[should_panic(expected = "does not hold a value")]
    fn test_value_as_mismatch_panics() {
        let v = Variant::new(1.0f32);
        let _ = v.value_as::<f64>();
    }

    #[test]
    fn test_with_type_alias() {
        let tag = Variant::with_type(1i32, TypeId::SYNC_TAG);
        assert!(tag.is_control());
        assert_eq!(*tag.value_as::<i32>(), 1);
    }

    #[test]
    #[should_panic(expected = "not registered as an alias")]
    fn test_with_type_unregistered_panics() {
        let _ = Variant::with_type(1.0f64, TypeId::SYNC_TAG);
    }

    #[test]
    fn test_matrix_round_trip_every_element_type() {
        fn check<T>()
        where
            T: Clone + Default,
            Matrix<T>: VariantValue + PartialEq + std::fmt::Debug,
        {
            let m = Matrix::<T>::new(2, 3);
            let v = Variant::new(m.clone());
            assert_eq!(v.type_id(), <Matrix<T>>::TYPE_ID);
            assert!(v.is_matrix());
            assert_eq!(v.value_as::<Matrix<T>>(), &m);
        }
        check::<i8>();
        check::<i16>();
        check::<i32>();
        check::<i64>();
        check::<u8>();
        check::<u16>();
        check::<u32>();
        check::<u64>();
        check::<f32>();
        check::<f64>();
        check::<bool>();
        check::<Color<u8>>();
        check::<Color4<u8>>();
        check::<Color<u16>>();
        check::<Color<f32>>();
        check::<Complex<i32>>();
        check::<Complex<f32>>();
        check::<Complex<f64>>();
    }

    proptest! {
        #[test]
        fn prop_i64_round_trip(x: i64) {
            prop_assert_eq!(*Variant::new(x).value_as::<i64>(), x);
        }

        #[test]
        fn prop_u8_round_trip(x: u8) {
            prop_assert_eq!(*Variant::new(x).value_as::<u8>(), x);
        }

        #[test]
        fn prop_f64_round_trip(x in proptest::num::f64::NORMAL) {
            prop_assert_eq!(*Variant::new(x).value_as::<f64>(), x);
        }

        #[test]
        fn prop_string_round_trip(s in ".{0,32}") {
            let v = Variant::new(s.clone());
            prop_assert_eq!(v.value_as::<String>(), &s);
        }

        #[test]
        fn prop_int_matrix_round_trip(data in proptest::collection::vec(any::<i32>(), 12)) {
            let m = Matrix::from_vec(3, 4, data).unwrap();
            let v = Variant::new(m.clone());
            prop_assert_eq!(v.value_as::<Matrix<i32>>(), &m);
        }
    }
}
