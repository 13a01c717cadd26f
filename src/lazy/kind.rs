//! Scalar kinds a lazily decoded field can be converted to.
//!
//! Each kind fixes the wire type its values are encoded with and how one
//! value is read from the front of a captured byte span. Narrowing kinds
//! check the decoded range explicitly.

use super::error::FieldError;
use crate::encoding::{
    decode_fixed32, decode_fixed64, decode_varint_slice, decode_zigzag64, narrow_i32, narrow_u32,
    narrow_zigzag32, WireType,
};

/// A scalar field kind.
///
/// This trait is sealed; the implementations are the unit types in this
/// module.
pub trait ScalarKind: sealed::Sealed {
    type Output;

    /// The wire type of a single, unpacked value.
    const WIRE_TYPE: WireType;

    /// Reads one value from the front of `bytes`, returning it together with
    /// the number of bytes it occupied.
    fn convert(bytes: &bytes::Bytes) -> Result<(Self::Output, usize), FieldError>;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! varint_kind {
    ($(#[$attr:meta])* $name:ident, $ty:ty, |$value:ident| $convert:expr) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl sealed::Sealed for $name {}

        impl ScalarKind for $name {
            type Output = $ty;
            const WIRE_TYPE: WireType = WireType::Varint;

            #[inline]
            fn convert(bytes: &bytes::Bytes) -> Result<($ty, usize), FieldError> {
                let ($value, len) = decode_varint_slice(bytes)?;
                Ok(($convert, len))
            }
        }
    };
}

varint_kind!(
    /// `bool`: zero is false, anything else is true.
    Bool, bool, |value| value != 0
);
varint_kind!(Int32, i32, |value| narrow_i32(value)?);
varint_kind!(Int64, i64, |value| value as i64);
varint_kind!(UInt32, u32, |value| narrow_u32(value)?);
varint_kind!(UInt64, u64, |value| value);
varint_kind!(
    /// `sint32`, ZigZag encoded.
    SInt32, i32, |value| narrow_zigzag32(value)?
);
varint_kind!(
    /// `sint64`, ZigZag encoded.
    SInt64, i64, |value| decode_zigzag64(value)
);

macro_rules! fixed_kind {
    ($(#[$attr:meta])* $name:ident, $ty:ty, $wire_type:expr, $decode:ident, |$value:ident| $convert:expr) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl sealed::Sealed for $name {}

        impl ScalarKind for $name {
            type Output = $ty;
            const WIRE_TYPE: WireType = $wire_type;

            #[inline]
            fn convert(bytes: &bytes::Bytes) -> Result<($ty, usize), FieldError> {
                let ($value, len) = $decode(bytes)?;
                Ok(($convert, len))
            }
        }
    };
}

fixed_kind!(Fixed32, u32, WireType::ThirtyTwoBit, decode_fixed32, |value| value);
fixed_kind!(SFixed32, i32, WireType::ThirtyTwoBit, decode_fixed32, |value| value as i32);
fixed_kind!(Float, f32, WireType::ThirtyTwoBit, decode_fixed32, |value| f32::from_bits(value));
fixed_kind!(Fixed64, u64, WireType::SixtyFourBit, decode_fixed64, |value| value);
fixed_kind!(SFixed64, i64, WireType::SixtyFourBit, decode_fixed64, |value| value as i64);
fixed_kind!(Double, f64, WireType::SixtyFourBit, decode_fixed64, |value| f64::from_bits(value));

/// `string`: the whole span, validated as UTF-8.
#[derive(Debug, Clone, Copy)]
pub struct String;

impl sealed::Sealed for String {}

impl ScalarKind for String {
    type Output = std::string::String;
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn convert(bytes: &bytes::Bytes) -> Result<(Self::Output, usize), FieldError> {
        match std::str::from_utf8(bytes) {
            Ok(value) => Ok((value.to_owned(), bytes.len())),
            Err(_) => Err(FieldError::InvalidString),
        }
    }
}

/// `bytes`: the whole span, shared with the decoded buffer.
#[derive(Debug, Clone, Copy)]
pub struct Bytes;

impl sealed::Sealed for self::Bytes {}

impl ScalarKind for self::Bytes {
    type Output = bytes::Bytes;
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn convert(bytes: &bytes::Bytes) -> Result<(Self::Output, usize), FieldError> {
        Ok((bytes.clone(), bytes.len()))
    }
}
