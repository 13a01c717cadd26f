//! Selector-driven lazy decoding.
//!
//! A [`Decoder`] walks an encoded message with a [`Def`] and captures the raw
//! bytes of the selected fields only; everything else is skipped. Captured
//! fields are converted to typed values on demand through [`FieldData`].
//!
//! ```
//! use lazypb::lazy::{Decoder, Def};
//!
//! // field 1: varint 150, field 2: packed [3, 270]
//! let buf: &'static [u8] = &[0x08, 0x96, 0x01, 0x12, 0x03, 0x03, 0x8E, 0x02];
//!
//! let def = Def::new([1, 2]);
//! def.validate()?;
//!
//! let decoder = Decoder::default();
//! let result = decoder.decode(buf, &def)?;
//! assert_eq!(result.field_data(1).int32_value()?, 150);
//! assert_eq!(result.field_data(2).uint64_values()?, vec![3, 270]);
//! result.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::mem;
use std::sync::Arc;

use bytes::{Buf, Bytes};
use log::trace;

use crate::decode_error_kind::{BufferUnderflow, UnexpectedWireType};
use crate::encoding::{
    decode_key, decode_varint, decode_varint_slice, skip_field, DecodeContext, WireType,
};
use crate::DecodeError;

mod def;
mod error;
mod field_data;
pub mod kind;
mod pool;

pub use def::Def;
pub use error::{DefViolation, FieldError, InvalidDefError};
pub use field_data::{FieldData, FieldMap, Fields, Occurrence};
pub use kind::ScalarKind;
pub use pool::{MapPool, DEFAULT_MAX_RETAINED};

/// Decodes buffers under a selector, taking field maps from a shared pool.
#[derive(Debug, Clone)]
pub struct Decoder {
    pool: Arc<MapPool>,
}

impl Decoder {
    pub fn new(pool: Arc<MapPool>) -> Decoder {
        Decoder { pool }
    }

    pub fn pool(&self) -> &Arc<MapPool> {
        &self.pool
    }

    /// Decodes a whole buffer, capturing the fields selected by `def`.
    ///
    /// Malformed input fails the whole decode and no partial result is
    /// returned. Fields that are not selected are skipped without being
    /// interpreted beyond their length.
    pub fn decode(&self, buf: impl Into<Bytes>, def: &Def) -> Result<DecodeResult, DecodeError> {
        let buf = buf.into();
        trace!("lazy decode: {} bytes, {} selected tags", buf.len(), def.len());
        let fields = decode_message(&self.pool, buf, def, DecodeContext::default())?;
        trace!("lazy decode done: {} tags captured", fields.len());
        Ok(DecodeResult {
            fields,
            pool: self.pool.clone(),
        })
    }
}

impl Default for Decoder {
    /// A decoder with a pool of its own.
    fn default() -> Self {
        Decoder::new(Arc::new(MapPool::new()))
    }
}

fn decode_message(
    pool: &MapPool,
    buf: Bytes,
    def: &Def,
    ctx: DecodeContext,
) -> Result<FieldMap, DecodeError> {
    let mut fields = pool.acquire();
    match merge_fields(pool, &mut fields, buf, def, ctx) {
        Ok(()) => Ok(fields),
        Err(error) => {
            pool.release(fields);
            Err(error)
        }
    }
}

fn merge_fields(
    pool: &MapPool,
    fields: &mut FieldMap,
    mut buf: Bytes,
    def: &Def,
    ctx: DecodeContext,
) -> Result<(), DecodeError> {
    while buf.has_remaining() {
        let (tag, wire_type) = decode_key(&mut buf)?;
        // Field numbers never exceed 2^29 - 1, so they fit an `i32`.
        let tag = tag as i32;
        let selected = match def.get(tag) {
            Some(selected) => selected,
            None => {
                trace!("skipping unselected tag {}", tag);
                skip_field(wire_type, &mut buf)?;
                continue;
            }
        };

        let occurrence = match selected {
            Some(nested) => {
                if wire_type != WireType::LengthDelimited {
                    return Err(
                        UnexpectedWireType::new(wire_type, WireType::LengthDelimited).into(),
                    );
                }
                ctx.limit_reached()?;
                let payload = take_value(wire_type, &mut buf)?;
                let map = decode_message(pool, payload, nested, ctx.enter_recursion())?;
                Occurrence::Nested(map)
            }
            None => Occurrence::Scalar(wire_type, take_value(wire_type, &mut buf)?),
        };
        fields.entry(tag).or_default().push(wire_type, occurrence);
    }
    Ok(())
}

/// Splits the value of a field whose key has been consumed off the front of
/// `buf`. Length-delimited values lose their length prefix.
fn take_value(wire_type: WireType, buf: &mut Bytes) -> Result<Bytes, DecodeError> {
    let len = match wire_type {
        WireType::Varint => decode_varint_slice(&buf[..])?.1,
        WireType::ThirtyTwoBit => 4,
        WireType::SixtyFourBit => 8,
        WireType::LengthDelimited => {
            let len = decode_varint(buf)?;
            if len > buf.remaining() as u64 {
                return Err(BufferUnderflow::new().into());
            }
            len as usize
        }
    };
    if len > buf.remaining() {
        return Err(BufferUnderflow::new().into());
    }
    Ok(buf.split_to(len))
}

/// The fields captured by one [`Decoder::decode`] call.
///
/// Dropping the result, or calling [`DecodeResult::close`], returns every
/// field map it owns to the decoder's pool.
#[derive(Debug)]
pub struct DecodeResult {
    fields: FieldMap,
    pool: Arc<MapPool>,
}

impl DecodeResult {
    /// The data captured for `tag`; empty if the tag did not occur.
    pub fn field_data(&self, tag: i32) -> &FieldData {
        self.fields.get(&tag).unwrap_or(&field_data::EMPTY)
    }

    pub fn fields(&self) -> Fields<'_> {
        Fields::new(&self.fields)
    }

    /// Iterates the fields that occurred, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &FieldData)> + '_ {
        self.fields.iter().map(|(tag, data)| (*tag, data))
    }

    /// Releases the captured fields to the pool.
    ///
    /// Consuming `self` runs the release in `Drop`; a closed result cannot be
    /// read again.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for DecodeResult {
    fn drop(&mut self) {
        self.pool.release(mem::take(&mut self.fields));
    }
}
