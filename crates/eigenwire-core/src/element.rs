//! Element types: the closed set of numeric types carried on the wire.
//!
//! Every array payload is a run of little-endian elements of exactly one
//! type. The tag values are part of the protocol and match the protobuf
//! `DataType` enum.

use static_assertions::assert_eq_size;
use zerocopy::byteorder::{LittleEndian, F64, I32};
use zerocopy::{AsBytes, FromBytes, Unaligned};

use crate::array::Values;

/// Wire tag for 32-bit signed integers.
pub const TAG_INTEGER: i32 = 0;

/// Wire tag for 64-bit IEEE-754 doubles.
pub const TAG_DOUBLE: i32 = 1;

/// Numeric element type of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// `i32`, 4 bytes per element.
    Integer,
    /// `f64`, 8 bytes per element.
    Double,
}

impl ElementType {
    /// Size of one element on the wire, in bytes.
    pub const fn width(self) -> usize {
        match self {
            ElementType::Integer => 4,
            ElementType::Double => 8,
        }
    }

    /// Protocol name, as used in the protobuf enum.
    pub const fn name(self) -> &'static str {
        match self {
            ElementType::Integer => "INTEGER",
            ElementType::Double => "DOUBLE",
        }
    }

    pub const fn tag(self) -> i32 {
        match self {
            ElementType::Integer => TAG_INTEGER,
            ElementType::Double => TAG_DOUBLE,
        }
    }

    /// Map a wire tag back to an element type. Unknown tags yield `None`.
    pub const fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            TAG_INTEGER => Some(ElementType::Integer),
            TAG_DOUBLE => Some(ElementType::Double),
            _ => None,
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Element trait ─────────────────────────────────────────────────────────────

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for f64 {}
}

/// A Rust scalar that maps onto one `ElementType`.
///
/// Sealed: the set of element types is closed. `Wire` is the unaligned
/// little-endian representation used for (de)serializing payload bytes.
pub trait Element: sealed::Sealed + Copy + Send + Sync + 'static {
    const TYPE: ElementType;

    type Wire: AsBytes + FromBytes + Unaligned + Copy;

    fn to_wire(self) -> Self::Wire;

    fn from_wire(wire: Self::Wire) -> Self;

    /// Wrap an owned buffer in the matching `Values` variant.
    fn into_values(values: Vec<Self>) -> Values;

    /// Borrow the buffer if `values` holds this element type.
    fn view(values: &Values) -> Option<&[Self]>;

    /// Take the buffer if `values` holds this element type.
    fn take(values: Values) -> Option<Vec<Self>>;
}

impl Element for i32 {
    const TYPE: ElementType = ElementType::Integer;
    type Wire = I32<LittleEndian>;

    fn to_wire(self) -> Self::Wire {
        I32::new(self)
    }

    fn from_wire(wire: Self::Wire) -> Self {
        wire.get()
    }

    fn into_values(values: Vec<Self>) -> Values {
        Values::Integer(values)
    }

    fn view(values: &Values) -> Option<&[Self]> {
        match values {
            Values::Integer(v) => Some(v),
            Values::Double(_) => None,
        }
    }

    fn take(values: Values) -> Option<Vec<Self>> {
        match values {
            Values::Integer(v) => Some(v),
            Values::Double(_) => None,
        }
    }
}

impl Element for f64 {
    const TYPE: ElementType = ElementType::Double;
    type Wire = F64<LittleEndian>;

    fn to_wire(self) -> Self::Wire {
        F64::new(self)
    }

    fn from_wire(wire: Self::Wire) -> Self {
        wire.get()
    }

    fn into_values(values: Vec<Self>) -> Values {
        Values::Double(values)
    }

    fn view(values: &Values) -> Option<&[Self]> {
        match values {
            Values::Double(v) => Some(v),
            Values::Integer(_) => None,
        }
    }

    fn take(values: Values) -> Option<Vec<Self>> {
        match values {
            Values::Double(v) => Some(v),
            Values::Integer(_) => None,
        }
    }
}

// Wire widths are protocol. If these fail, payload framing has silently changed.
assert_eq_size!(I32<LittleEndian>, [u8; 4]);
assert_eq_size!(F64<LittleEndian>, [u8; 8]);

/// Append `elements` to `out` as little-endian bytes.
pub fn write_le<T: Element>(elements: &[T], out: &mut Vec<u8>) {
    out.reserve(elements.len() * T::TYPE.width());
    for element in elements {
        out.extend_from_slice(element.to_wire().as_bytes());
    }
}

/// Decode a little-endian payload onto the end of `out`.
///
/// Returns `false`, leaving `out` untouched, if `bytes` is not a whole
/// number of elements.
pub fn append_le<T: Element>(bytes: &[u8], out: &mut Vec<T>) -> bool {
    let Some(wire) = T::Wire::slice_from(bytes) else {
        return false;
    };
    out.extend(wire.iter().map(|w| T::from_wire(*w)));
    true
}

/// Read a little-endian payload back into elements.
pub fn read_le<T: Element>(bytes: &[u8]) -> Option<Vec<T>> {
    let mut out = Vec::with_capacity(bytes.len() / T::TYPE.width());
    append_le(bytes, &mut out).then_some(out)
}
