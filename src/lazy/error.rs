//! Errors raised by typed field access and by selector validation.

use std::error::Error;
use std::fmt;

use crate::decode_error_kind::ValueOverflow;
use crate::encoding::WireType;
use crate::{DecodeError, DecodeErrorKind};

/// A failed typed access to a lazily decoded field.
///
/// Access errors are local to the field being read; other fields of the same
/// decode result stay readable.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FieldError {
    /// The field never occurred in the decoded buffer.
    TagNotFound,
    /// The wire type on the wire is not the one the requested kind is
    /// encoded with.
    WireTypeMismatch {
        expected: WireType,
        actual: WireType,
    },
    /// A decoded integer does not fit the requested narrower kind.
    ValueOverflow { value: u64, target: &'static str },
    /// The field was selected with a nested `Def` and holds a message.
    NotScalar,
    /// A message view was requested for a field captured as raw bytes.
    NotNested,
    /// The captured bytes are not a valid encoding of the requested kind.
    Malformed(DecodeError),
    /// A string field is not valid UTF-8.
    InvalidString,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::TagNotFound => f.write_str("tag not found"),
            FieldError::WireTypeMismatch { expected, actual } => {
                write!(f, "wire type mismatch: {actual} (expected {expected})")
            }
            FieldError::ValueOverflow { value, target } => {
                write!(f, "value {value:#x} overflows {target}")
            }
            FieldError::NotScalar => f.write_str("field holds a nested message, not a scalar"),
            FieldError::NotNested => f.write_str("field was not selected as a nested message"),
            FieldError::Malformed(error) => write!(f, "malformed field value: {}", error.kind()),
            FieldError::InvalidString => f.write_str("invalid string value: data is not UTF-8 encoded"),
        }
    }
}

impl Error for FieldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FieldError::Malformed(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ValueOverflow> for FieldError {
    fn from(overflow: ValueOverflow) -> Self {
        FieldError::ValueOverflow {
            value: overflow.value(),
            target: overflow.target(),
        }
    }
}

impl From<DecodeError> for FieldError {
    fn from(error: DecodeError) -> Self {
        match error.kind() {
            DecodeErrorKind::ValueOverflow(overflow) => overflow.clone().into(),
            DecodeErrorKind::InvalidString(_) => FieldError::InvalidString,
            _ => FieldError::Malformed(error),
        }
    }
}

/// Why a tag in a [`Def`](super::Def) is not a valid field number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefViolation {
    Negative,
    /// Inside `19000..=19999`.
    Reserved,
    /// Greater than `2^29 - 1`.
    TooLarge,
}

impl fmt::Display for DefViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DefViolation::Negative => "negative",
            DefViolation::Reserved => "in the reserved range",
            DefViolation::TooLarge => "larger than the maximum field number",
        })
    }
}

/// The first invalid tag found while validating a [`Def`](super::Def).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDefError {
    tag: i32,
    path: Vec<i32>,
    reason: DefViolation,
}

impl InvalidDefError {
    pub(crate) fn new(tag: i32, path: Vec<i32>, reason: DefViolation) -> Self {
        InvalidDefError { tag, path, reason }
    }

    /// The offending tag.
    pub fn tag(&self) -> i32 {
        self.tag
    }

    /// Tags of the nested selectors leading to the offending node, from the
    /// root down. Empty when the tag is in the root selector.
    pub fn path(&self) -> &[i32] {
        &self.path
    }

    pub fn reason(&self) -> DefViolation {
        self.reason
    }
}

impl fmt::Display for InvalidDefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid tag {} in selector at path [", self.tag)?;
        for (i, tag) in self.path.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{tag}")?;
        }
        write!(f, "]: {}", self.reason)
    }
}

impl Error for InvalidDefError {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encoding::{narrow_i32, narrow_u32};

    #[test]
    fn overflow_keeps_value_and_target() {
        let error = FieldError::from(narrow_u32(1 << 33).unwrap_err());
        assert_eq!(
            error,
            FieldError::ValueOverflow {
                value: 1 << 33,
                target: "uint32"
            }
        );
        assert_eq!(error.to_string(), "value 0x200000000 overflows uint32");

        let error = FieldError::from(narrow_i32(1 << 31).unwrap_err());
        assert!(matches!(error, FieldError::ValueOverflow { target: "int32", .. }));
    }

    #[test]
    fn def_error_display() {
        let error = InvalidDefError::new(-1, vec![1, 2], DefViolation::Negative);
        assert_eq!(error.to_string(), "invalid tag -1 in selector at path [1, 2]: negative");
        assert_eq!(error.path(), &[1, 2]);
    }
}
