use core::fmt;

use crate::error::decode_error_kind::{InvalidWireType, UnexpectedWireType};
use crate::DecodeError;

/// How the value following a key is delimited.
///
/// Discriminants are the three low bits of the key. Group wire types (3 and
/// 4) are not supported and fail to decode like unassigned values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    SixtyFourBit = 1,
    LengthDelimited = 2,
    ThirtyTwoBit = 5,
}

impl TryFrom<u64> for WireType {
    type Error = DecodeError;

    #[inline]
    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::SixtyFourBit),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::ThirtyTwoBit),
            _ => Err(InvalidWireType::new(value).into()),
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WireType::Varint => "varint",
            WireType::SixtyFourBit => "fixed64",
            WireType::LengthDelimited => "length-delimited",
            WireType::ThirtyTwoBit => "fixed32",
        })
    }
}

/// Fails with `UnexpectedWireType` unless `actual` is `expected`.
#[inline]
pub fn check_wire_type(expected: WireType, actual: WireType) -> Result<(), DecodeError> {
    if expected != actual {
        return Err(UnexpectedWireType::new(actual, expected).into());
    }
    Ok(())
}
