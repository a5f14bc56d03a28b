//! Type identifiers for variant payloads.
//!
//! The id space is partitioned into 32-id blocks so that category checks are
//! plain bit tests:
//!
//! ```text
//! 0x00-0x1f  primitives (0x08 bit = unsigned, 0x10 bit = float, 0x18 = bool)
//! 0x20-0x3f  control tags
//! 0x40-0x5f  matrices (0x40 + primitive id, then color and complex matrices)
//! 0x80-0x9f  colors
//! 0xa0-0xbf  complex numbers (0xa0 + primitive id)
//! 0xc0-0xdf  text
//! 0xe0-0xff  framework values (socket state)
//! ```

use std::fmt;

/// Stable identifier of a payload shape.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    const BLOCK_MASK: u32 = !0x1f;

    pub const CHAR: TypeId = TypeId(0x00);
    pub const SHORT: TypeId = TypeId(0x01);
    pub const INT: TypeId = TypeId(0x02);
    pub const INT64: TypeId = TypeId(0x03);
    pub const UCHAR: TypeId = TypeId(0x08);
    pub const USHORT: TypeId = TypeId(0x09);
    pub const UINT: TypeId = TypeId(0x0a);
    pub const UINT64: TypeId = TypeId(0x0b);
    pub const FLOAT: TypeId = TypeId(0x10);
    pub const DOUBLE: TypeId = TypeId(0x11);
    pub const BOOL: TypeId = TypeId(0x18);
    pub const LAST_PRIMITIVE: TypeId = TypeId::BOOL;

    pub const SYNC_TAG: TypeId = TypeId(0x20);
    pub const STOP_TAG: TypeId = TypeId(0x21);
    pub const PAUSE_TAG: TypeId = TypeId(0x22);
    pub const RESUME_TAG: TypeId = TypeId(0x23);
    pub const RECONFIGURATION_TAG: TypeId = TypeId(0x24);

    pub const MATRIX_BASE: u32 = 0x40;
    pub const CHAR_MATRIX: TypeId = TypeId(0x40);
    pub const SHORT_MATRIX: TypeId = TypeId(0x41);
    pub const INT_MATRIX: TypeId = TypeId(0x42);
    pub const INT64_MATRIX: TypeId = TypeId(0x43);
    pub const UCHAR_MATRIX: TypeId = TypeId(0x48);
    pub const USHORT_MATRIX: TypeId = TypeId(0x49);
    pub const UINT_MATRIX: TypeId = TypeId(0x4a);
    pub const UINT64_MATRIX: TypeId = TypeId(0x4b);
    pub const FLOAT_MATRIX: TypeId = TypeId(0x50);
    pub const DOUBLE_MATRIX: TypeId = TypeId(0x51);
    pub const BOOL_MATRIX: TypeId = TypeId(0x58);
    pub const UCHAR_COLOR_MATRIX: TypeId = TypeId(0x59);
    pub const UCHAR_COLOR4_MATRIX: TypeId = TypeId(0x5a);
    pub const USHORT_COLOR_MATRIX: TypeId = TypeId(0x5b);
    pub const FLOAT_COLOR_MATRIX: TypeId = TypeId(0x5c);
    pub const INT_COMPLEX_MATRIX: TypeId = TypeId(0x5d);
    pub const FLOAT_COMPLEX_MATRIX: TypeId = TypeId(0x5e);
    pub const DOUBLE_COMPLEX_MATRIX: TypeId = TypeId(0x5f);

    pub const UCHAR_COLOR: TypeId = TypeId(0x80);
    pub const UCHAR_COLOR4: TypeId = TypeId(0x81);
    pub const USHORT_COLOR: TypeId = TypeId(0x82);
    pub const FLOAT_COLOR: TypeId = TypeId(0x83);

    pub const INT_COMPLEX: TypeId = TypeId(0xa2);
    pub const FLOAT_COMPLEX: TypeId = TypeId(0xb0);
    pub const DOUBLE_COMPLEX: TypeId = TypeId(0xb1);

    pub const STRING: TypeId = TypeId(0xc0);

    pub const SOCKET_STATE: TypeId = TypeId(0xe0);

    pub const INVALID: TypeId = TypeId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn is_primitive(self) -> bool {
        self.0 <= Self::LAST_PRIMITIVE.0
    }

    /// True for signed and unsigned integer primitives, including chars.
    #[inline]
    pub fn is_integer(self) -> bool {
        self.is_primitive() && self.0 & 0x10 == 0
    }

    #[inline]
    pub fn is_float(self) -> bool {
        self.is_primitive() && self.0 & 0x18 == 0x10
    }

    #[inline]
    pub fn is_unsigned(self) -> bool {
        self.is_primitive() && self.0 & 0x18 == 0x08
    }

    /// Numeric primitives: every primitive except `bool`.
    #[inline]
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    #[inline]
    pub fn is_control(self) -> bool {
        self.0 & Self::BLOCK_MASK == 0x20
    }

    #[inline]
    pub fn is_matrix(self) -> bool {
        self.0 & Self::BLOCK_MASK == 0x40
    }

    #[inline]
    pub fn is_color(self) -> bool {
        self.0 & Self::BLOCK_MASK == 0x80
    }

    #[inline]
    pub fn is_complex(self) -> bool {
        self.0 & Self::BLOCK_MASK == 0xa0
    }

    /// Matrix type holding elements of the given primitive type.
    pub fn matrix_of(element: TypeId) -> Option<TypeId> {
        element
            .is_primitive()
            .then_some(TypeId(Self::MATRIX_BASE + element.0))
    }

    /// Primitive element type of a primitive matrix type.
    pub fn matrix_element(self) -> Option<TypeId> {
        if self.is_matrix() && self.0 <= Self::BOOL_MATRIX.0 {
            Some(TypeId(self.0 - Self::MATRIX_BASE))
        } else {
            None
        }
    }

    /// Short human-readable name, `None` for ids outside the built-in set.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::CHAR => "i8",
            Self::SHORT => "i16",
            Self::INT => "i32",
            Self::INT64 => "i64",
            Self::UCHAR => "u8",
            Self::USHORT => "u16",
            Self::UINT => "u32",
            Self::UINT64 => "u64",
            Self::FLOAT => "f32",
            Self::DOUBLE => "f64",
            Self::BOOL => "bool",
            Self::SYNC_TAG => "sync tag",
            Self::STOP_TAG => "stop tag",
            Self::PAUSE_TAG => "pause tag",
            Self::RESUME_TAG => "resume tag",
            Self::RECONFIGURATION_TAG => "reconfiguration tag",
            Self::CHAR_MATRIX => "Matrix<i8>",
            Self::SHORT_MATRIX => "Matrix<i16>",
            Self::INT_MATRIX => "Matrix<i32>",
            Self::INT64_MATRIX => "Matrix<i64>",
            Self::UCHAR_MATRIX => "Matrix<u8>",
            Self::USHORT_MATRIX => "Matrix<u16>",
            Self::UINT_MATRIX => "Matrix<u32>",
            Self::UINT64_MATRIX => "Matrix<u64>",
            Self::FLOAT_MATRIX => "Matrix<f32>",
            Self::DOUBLE_MATRIX => "Matrix<f64>",
            Self::BOOL_MATRIX => "Matrix<bool>",
            Self::UCHAR_COLOR_MATRIX => "Matrix<Color<u8>>",
            Self::UCHAR_COLOR4_MATRIX => "Matrix<Color4<u8>>",
            Self::USHORT_COLOR_MATRIX => "Matrix<Color<u16>>",
            Self::FLOAT_COLOR_MATRIX => "Matrix<Color<f32>>",
            Self::INT_COMPLEX_MATRIX => "Matrix<Complex<i32>>",
            Self::FLOAT_COMPLEX_MATRIX => "Matrix<Complex<f32>>",
            Self::DOUBLE_COMPLEX_MATRIX => "Matrix<Complex<f64>>",
            Self::UCHAR_COLOR => "Color<u8>",
            Self::UCHAR_COLOR4 => "Color4<u8>",
            Self::USHORT_COLOR => "Color<u16>",
            Self::FLOAT_COLOR => "Color<f32>",
            Self::INT_COMPLEX => "Complex<i32>",
            Self::FLOAT_COMPLEX => "Complex<f32>",
            Self::DOUBLE_COMPLEX => "Complex<f64>",
            Self::STRING => "String",
            Self::SOCKET_STATE => "SocketState",
            _ => return None,
        };
        Some(name)
    }
}

impl Default for TypeId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "TypeId(INVALID)")
        } else {
            write!(f, "TypeId(0x{:02x})", self.0)
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:02x})", name, self.0),
            None => fmt::Debug::fmt(self, f),
        }
    }
}
