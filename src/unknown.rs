use std::fmt;

use bytes::{Buf, BufMut};

use crate::encoding::{self, DecodeContext, WireType};
use crate::DecodeError;

/// Fields of a message that its declaration does not know about.
///
/// The bytes of every unknown field (key and value) are kept exactly as they
/// were decoded, and are written back after the known fields when the message
/// is encoded again. Relative ordering against known fields is not retained.
#[derive(Default, Clone, PartialEq, Eq, Hash)]
pub struct UnknownFields {
    raw: Vec<u8>,
}

/// One preserved unknown field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownField<'a> {
    pub tag: u32,
    pub wire_type: WireType,
    /// The value bytes following the key, including the length prefix of a
    /// length-delimited field.
    pub value: &'a [u8],
}

impl UnknownFields {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records the field whose key has just been read from `buf`.
    pub fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        let start = self.raw.len();
        encoding::copy_key(tag, wire_type, &ctx, &mut self.raw);
        let result = encoding::copy_field(wire_type, buf, &mut self.raw);
        if result.is_err() {
            self.raw.truncate(start);
        }
        result
    }

    pub fn encode_raw(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.raw);
    }

    pub fn encoded_len(&self) -> usize {
        self.raw.len()
    }

    /// The preserved bytes, in the order they were decoded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Iterates the preserved fields in decode order.
    pub fn iter(&self) -> UnknownFieldIter<'_> {
        UnknownFieldIter { rest: &self.raw }
    }
}

impl fmt::Debug for UnknownFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a UnknownFields {
    type Item = UnknownField<'a>;
    type IntoIter = UnknownFieldIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the fields of an [`UnknownFields`].
#[derive(Debug, Clone)]
pub struct UnknownFieldIter<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for UnknownFieldIter<'a> {
    type Item = UnknownField<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        // The bytes were validated when they were recorded.
        let mut cursor = self.rest;
        let (tag, wire_type) = encoding::decode_key(&mut cursor).ok()?;
        let value_start = cursor;
        encoding::skip_field(wire_type, &mut cursor).ok()?;
        let value_len = value_start.len() - cursor.len();
        self.rest = cursor;
        Some(UnknownField {
            tag,
            wire_type,
            value: &value_start[..value_len],
        })
    }
}
