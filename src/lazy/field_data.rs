use std::collections::HashMap;

use bytes::Buf;

use super::error::FieldError;
use super::kind::{self, ScalarKind};
use crate::encoding::WireType;

/// Lazily decoded fields of one message level, keyed by tag.
pub type FieldMap = HashMap<i32, FieldData>;

/// One occurrence of a field on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Occurrence {
    /// The value bytes as captured, without key or length prefix.
    Scalar(WireType, bytes::Bytes),
    /// A message decoded under a nested selector.
    Nested(FieldMap),
}

/// Every occurrence of one selected field, kept undecoded until a typed
/// accessor asks for it.
///
/// A field that never occurred is represented by an empty `FieldData` with
/// wire type `Varint`; every accessor on it fails with
/// [`FieldError::TagNotFound`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldData {
    pub(super) wire_type: WireType,
    pub(super) occurrences: Vec<Occurrence>,
}

pub(super) static EMPTY: FieldData = FieldData {
    wire_type: WireType::Varint,
    occurrences: Vec::new(),
};

impl Default for FieldData {
    fn default() -> Self {
        FieldData {
            wire_type: WireType::Varint,
            occurrences: Vec::new(),
        }
    }
}

impl FieldData {
    pub(super) fn push(&mut self, wire_type: WireType, occurrence: Occurrence) {
        self.wire_type = wire_type;
        self.occurrences.push(occurrence);
    }

    /// The wire type of the last occurrence.
    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    /// Returns `true` if the field never occurred.
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// Number of times the field occurred.
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    /// Converts the last occurrence to `K`.
    ///
    /// Later occurrences of a field override earlier ones, as in a full
    /// decode.
    pub fn value<K: ScalarKind>(&self) -> Result<K::Output, FieldError> {
        match self.occurrences.last() {
            None => Err(FieldError::TagNotFound),
            Some(Occurrence::Nested(_)) => Err(FieldError::NotScalar),
            Some(Occurrence::Scalar(wire_type, bytes)) => {
                check_wire_type(K::WIRE_TYPE, *wire_type)?;
                K::convert(bytes).map(|(value, _)| value)
            }
        }
    }

    /// Converts every occurrence to `K`, in wire order.
    ///
    /// A length-delimited occurrence of a numeric kind is read as a packed
    /// run and yields one element per encoded value. An occurrence with the
    /// kind's own wire type yields exactly one element, so a non-repeated
    /// field produces a one-element list.
    pub fn values<K: ScalarKind>(&self) -> Result<Vec<K::Output>, FieldError> {
        if self.occurrences.is_empty() {
            return Err(FieldError::TagNotFound);
        }
        let mut values = Vec::with_capacity(self.occurrences.len());
        for occurrence in &self.occurrences {
            let (wire_type, bytes) = match occurrence {
                Occurrence::Scalar(wire_type, bytes) => (*wire_type, bytes),
                Occurrence::Nested(_) => return Err(FieldError::NotScalar),
            };
            if wire_type == K::WIRE_TYPE {
                values.push(K::convert(bytes)?.0);
            } else if wire_type == WireType::LengthDelimited {
                let mut packed = bytes.clone();
                while packed.has_remaining() {
                    let (value, len) = K::convert(&packed)?;
                    values.push(value);
                    packed.advance(len);
                }
            } else {
                return Err(FieldError::WireTypeMismatch {
                    expected: K::WIRE_TYPE,
                    actual: wire_type,
                });
            }
        }
        Ok(values)
    }

    /// The message in the last occurrence of a field selected with a nested
    /// `Def`.
    pub fn message(&self) -> Result<Fields<'_>, FieldError> {
        match self.occurrences.last() {
            None => Err(FieldError::TagNotFound),
            Some(Occurrence::Nested(map)) => Ok(Fields::new(map)),
            Some(Occurrence::Scalar(..)) => Err(FieldError::NotNested),
        }
    }

    /// The messages in every occurrence of a field selected with a nested
    /// `Def`, in wire order.
    pub fn messages(&self) -> Result<Vec<Fields<'_>>, FieldError> {
        if self.occurrences.is_empty() {
            return Err(FieldError::TagNotFound);
        }
        self.occurrences
            .iter()
            .map(|occurrence| match occurrence {
                Occurrence::Nested(map) => Ok(Fields::new(map)),
                Occurrence::Scalar(..) => Err(FieldError::NotNested),
            })
            .collect()
    }
}

fn check_wire_type(expected: WireType, actual: WireType) -> Result<(), FieldError> {
    if expected != actual {
        return Err(FieldError::WireTypeMismatch { expected, actual });
    }
    Ok(())
}

macro_rules! shorthands {
    ($($kind:ident => $value:ident, $values:ident;)*) => {
        impl FieldData {
            $(
                #[inline]
                pub fn $value(&self) -> Result<<kind::$kind as ScalarKind>::Output, FieldError> {
                    self.value::<kind::$kind>()
                }

                #[inline]
                pub fn $values(&self) -> Result<Vec<<kind::$kind as ScalarKind>::Output>, FieldError> {
                    self.values::<kind::$kind>()
                }
            )*
        }
    };
}

shorthands! {
    Bool => bool_value, bool_values;
    String => string_value, string_values;
    Bytes => bytes_value, bytes_values;
    Int32 => int32_value, int32_values;
    Int64 => int64_value, int64_values;
    UInt32 => uint32_value, uint32_values;
    UInt64 => uint64_value, uint64_values;
    SInt32 => sint32_value, sint32_values;
    SInt64 => sint64_value, sint64_values;
    Fixed32 => fixed32_value, fixed32_values;
    Fixed64 => fixed64_value, fixed64_values;
    SFixed32 => sfixed32_value, sfixed32_values;
    SFixed64 => sfixed64_value, sfixed64_values;
    Float => float_value, float_values;
    Double => double_value, double_values;
}

/// A read-only view of the fields decoded at one message level.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: &'a FieldMap,
}

impl<'a> Fields<'a> {
    pub(super) fn new(map: &'a FieldMap) -> Self {
        Fields { map }
    }

    /// The data captured for `tag`; empty if the tag did not occur.
    pub fn field_data(&self, tag: i32) -> &'a FieldData {
        self.map.get(&tag).unwrap_or(&EMPTY)
    }

    pub fn contains(&self, tag: i32) -> bool {
        self.map.contains_key(&tag)
    }

    /// Number of distinct tags that occurred.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates the fields that occurred, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &'a FieldData)> + 'a {
        self.map.iter().map(|(tag, data)| (*tag, data))
    }
}
