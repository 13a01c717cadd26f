//! Wire-level building blocks shared by `Message` implementations and the
//! lazy decoder.
//!
//! Every field kind gets a module (`int32`, `fixed64`, `string`, `message`,
//! ...) with the same set of functions: `encode`, `merge`, `encoded_len` and
//! their `_repeated`/`_packed` counterparts. Generated code calls these
//! directly; nothing here is meant to be used by hand.

#![allow(clippy::ptr_arg)]

use std::mem;

use ::bytes::{Buf, BufMut, Bytes};

use crate::error::decode_error_kind::{
    BufferUnderflow, DelimitedLengthExceeded, InvalidKey, InvalidString, InvalidTag,
    InvalidVarint, RecursionLimitReached, ValueOverflow,
};
use crate::DecodeError;
use crate::Message;

pub mod varint;
pub use varint::{decode_varint, decode_varint_slice, encode_varint, encoded_len_varint};

pub mod zigzag;
pub use zigzag::{decode_zigzag32, decode_zigzag64, encode_zigzag32, encode_zigzag64};

pub mod fixed;
pub use fixed::{decode_fixed32, decode_fixed64, encode_fixed32, encode_fixed64};

pub mod length_delimiter;
pub use length_delimiter::{
    decode_length_delimiter, encode_length_delimiter, length_delimiter_len,
};

pub mod wire_type;
pub use wire_type::{check_wire_type, WireType};

/// State threaded through a decode.
///
/// Tracks the remaining nesting budget and the bytes of the key most recently
/// read with [`DecodeContext::read_key`], so preserved fields can be written
/// back exactly as they arrived. Pass the context by value and hand
/// [`DecodeContext::enter_recursion`] to the level below.
#[derive(Clone, Copy, Debug)]
pub struct DecodeContext {
    depth_remaining: u32,
    key: RawKey,
}

/// Key bytes as read off the wire, padding included.
#[derive(Clone, Copy, Debug, Default)]
struct RawKey {
    bytes: [u8; varint::MAX_VARINT_LEN],
    len: u8,
}

impl RawKey {
    #[inline]
    fn as_slice(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }
}

impl Default for DecodeContext {
    #[inline]
    fn default() -> DecodeContext {
        DecodeContext {
            depth_remaining: crate::RECURSION_LIMIT,
            key: RawKey::default(),
        }
    }
}

impl DecodeContext {
    /// The context for a message nested one level deeper.
    #[inline]
    pub fn enter_recursion(self) -> DecodeContext {
        DecodeContext {
            depth_remaining: self.depth_remaining.saturating_sub(1),
            key: RawKey::default(),
        }
    }

    /// Fails once the nesting budget is spent.
    ///
    /// Always succeeds with the `no-recursion-limit` feature.
    #[inline]
    pub fn limit_reached(self) -> Result<(), DecodeError> {
        if cfg!(feature = "no-recursion-limit") || self.depth_remaining > 0 {
            Ok(())
        } else {
            Err(RecursionLimitReached::new().into())
        }
    }

    /// Reads a field key like [`decode_key`], remembering its bytes.
    #[inline]
    pub fn read_key(&mut self, buf: &mut impl Buf) -> Result<(u32, WireType), DecodeError> {
        let mut key = RawKey::default();
        while buf.has_remaining() && usize::from(key.len) < varint::MAX_VARINT_LEN {
            let byte = buf.get_u8();
            key.bytes[usize::from(key.len)] = byte;
            key.len += 1;
            if byte < 0x80 {
                break;
            }
        }
        let (value, _) = decode_varint_slice(key.as_slice())?;
        self.key = key;
        split_key(value)
    }

    /// The bytes of the last key read, if they encode `tag` and `wire_type`.
    pub fn raw_key(&self, tag: u32, wire_type: WireType) -> Option<&[u8]> {
        let raw = self.key.as_slice();
        match decode_varint_slice(raw) {
            Ok((value, _)) if split_key(value).ok() == Some((tag, wire_type)) => Some(raw),
            _ => None,
        }
    }
}

pub const MIN_TAG: u32 = 1;
pub const MAX_TAG: u32 = (1 << 29) - 1;

/// Field numbers reserved for the Protocol Buffers implementation itself.
pub const FIRST_RESERVED_TAG: u32 = 19_000;
pub const LAST_RESERVED_TAG: u32 = 19_999;

/// Returns `true` if `tag` may be declared as a field number.
#[inline]
pub fn is_valid_tag(tag: u32) -> bool {
    (MIN_TAG..=MAX_TAG).contains(&tag) && !(FIRST_RESERVED_TAG..=LAST_RESERVED_TAG).contains(&tag)
}

/// Packs a field number and wire type into a key: `(tag << 3) | wire_type`.
#[inline]
pub fn make_key(tag: u32, wire_type: WireType) -> u32 {
    debug_assert!((MIN_TAG..=MAX_TAG).contains(&tag));
    (tag << 3) | wire_type as u32
}

/// Splits a decoded key into its field number and wire type.
#[inline]
pub fn split_key(key: u64) -> Result<(u32, WireType), DecodeError> {
    let key = u32::try_from(key).map_err(|_| DecodeError::from(InvalidKey::new(key)))?;
    let wire_type = WireType::try_from(u64::from(key & 0x07))?;
    match key >> 3 {
        0 => Err(InvalidTag::new().into()),
        tag => Ok((tag, wire_type)),
    }
}

#[inline]
pub fn encode_key(tag: u32, wire_type: WireType, buf: &mut impl BufMut) {
    encode_varint(u64::from(make_key(tag, wire_type)), buf);
}

#[inline(always)]
pub fn decode_key(buf: &mut impl Buf) -> Result<(u32, WireType), DecodeError> {
    split_key(decode_varint(buf)?)
}

/// Width of an encoded key for `tag`, between 1 and 5 bytes.
#[inline]
pub fn key_len(tag: u32) -> usize {
    encoded_len_varint(u64::from(tag << 3))
}

/// Narrows a decoded varint into an `int32`.
///
/// Negative `int32` values are written as sign-extended 64-bit varints, so the
/// value is reinterpreted as `i64` before the range check.
#[inline]
pub fn narrow_i32(value: u64) -> Result<i32, DecodeError> {
    i32::try_from(value as i64).map_err(|_| ValueOverflow::new(value, "int32").into())
}

#[inline]
pub fn narrow_u32(value: u64) -> Result<u32, DecodeError> {
    u32::try_from(value).map_err(|_| ValueOverflow::new(value, "uint32").into())
}

/// Narrows a decoded varint into a `sint32`, applying the ZigZag inverse.
#[inline]
pub fn narrow_zigzag32(value: u64) -> Result<i32, DecodeError> {
    u32::try_from(value)
        .map(decode_zigzag32)
        .map_err(|_| ValueOverflow::new(value, "sint32").into())
}

/// Reads a length prefix, then calls `merge` until exactly that many bytes
/// have been consumed.
pub fn merge_loop<T, M, B>(
    value: &mut T,
    buf: &mut B,
    ctx: DecodeContext,
    mut merge: M,
) -> Result<(), DecodeError>
where
    M: FnMut(&mut T, &mut B, DecodeContext) -> Result<(), DecodeError>,
    B: Buf,
{
    let len = decode_len(buf)?;
    let limit = buf.remaining() - len;
    while buf.remaining() > limit {
        merge(value, buf, ctx)?;
    }
    if buf.remaining() != limit {
        return Err(DelimitedLengthExceeded::new().into());
    }
    Ok(())
}

/// Reads a length prefix and checks that the buffer holds that many bytes.
#[inline]
fn decode_len(buf: &mut impl Buf) -> Result<usize, DecodeError> {
    let len = decode_varint(buf)?;
    if len > buf.remaining() as u64 {
        return Err(BufferUnderflow::new().into());
    }
    Ok(len as usize)
}

/// Skips over the value of a field whose key has already been consumed.
pub fn skip_field(wire_type: WireType, buf: &mut impl Buf) -> Result<(), DecodeError> {
    let len = match wire_type {
        WireType::Varint => return decode_varint(buf).map(drop),
        WireType::ThirtyTwoBit => 4,
        WireType::SixtyFourBit => 8,
        WireType::LengthDelimited => decode_varint(buf)?,
    };
    if len > buf.remaining() as u64 {
        return Err(BufferUnderflow::new().into());
    }
    buf.advance(len as usize);
    Ok(())
}

/// Writes the key of the field being merged: the original bytes when `ctx`
/// read them, the canonical encoding otherwise.
pub fn copy_key(tag: u32, wire_type: WireType, ctx: &DecodeContext, out: &mut Vec<u8>) {
    match ctx.raw_key(tag, wire_type) {
        Some(raw) => out.extend_from_slice(raw),
        None => encode_key(tag, wire_type, out),
    }
}

/// Copies a varint from `buf` to `out` byte for byte, returning its value.
///
/// Non-canonical encodings such as `[0x81, 0x80, 0x00]` are kept as they are.
fn copy_varint(buf: &mut impl Buf, out: &mut Vec<u8>) -> Result<u64, DecodeError> {
    let start = out.len();
    while buf.has_remaining() && out.len() - start < varint::MAX_VARINT_LEN {
        let byte = buf.get_u8();
        out.push(byte);
        if byte < 0x80 {
            return decode_varint_slice(&out[start..]).map(|(value, _)| value);
        }
    }
    Err(InvalidVarint::new().into())
}

/// Copies the raw value of a field whose key has already been consumed into
/// `out`, leaving its bytes exactly as they appeared on the wire.
pub fn copy_field(
    wire_type: WireType,
    buf: &mut impl Buf,
    out: &mut Vec<u8>,
) -> Result<(), DecodeError> {
    let len = match wire_type {
        WireType::Varint => return copy_varint(buf, out).map(drop),
        WireType::ThirtyTwoBit => 4,
        WireType::SixtyFourBit => 8,
        WireType::LengthDelimited => copy_varint(buf, out)?,
    };
    if len > buf.remaining() as u64 {
        return Err(BufferUnderflow::new().into());
    }
    out.put(buf.take(len as usize));
    Ok(())
}

/// How one numeric Protobuf type is laid out on the wire.
///
/// Implemented by the unit types in [`numeric`]; the per-type modules such as
/// [`int32`] and [`double`] are thin wrappers over the generic functions
/// there.
pub trait Numeric {
    type Value: Copy + Default;

    /// Wire type of a single, unpacked value.
    const WIRE_TYPE: WireType;

    fn put(value: Self::Value, buf: &mut impl BufMut);

    fn get(buf: &mut impl Buf) -> Result<Self::Value, DecodeError>;

    /// Encoded width of `value`, without key.
    fn value_len(value: Self::Value) -> usize;
}

pub mod numeric {
    //! Generic encode and decode functions over [`Numeric`] types.

    use super::*;

    macro_rules! varint_type {
        ($name:ident, $ty:ty, to_u64(|$to:ident| $to_u64:expr), from_u64(|$from:ident| $from_u64:expr)) => {
            #[derive(Debug, Clone, Copy)]
            pub struct $name;

            impl Numeric for $name {
                type Value = $ty;
                const WIRE_TYPE: WireType = WireType::Varint;

                #[inline]
                fn put($to: $ty, buf: &mut impl BufMut) {
                    encode_varint($to_u64, buf);
                }

                #[inline]
                fn get(buf: &mut impl Buf) -> Result<$ty, DecodeError> {
                    let $from = decode_varint(buf)?;
                    $from_u64
                }

                #[inline]
                fn value_len($to: $ty) -> usize {
                    encoded_len_varint($to_u64)
                }
            }
        };
    }

    varint_type!(Bool, bool, to_u64(|value| u64::from(value)), from_u64(|raw| Ok(raw != 0)));
    varint_type!(Int32, i32, to_u64(|value| value as u64), from_u64(|raw| narrow_i32(raw)));
    varint_type!(Int64, i64, to_u64(|value| value as u64), from_u64(|raw| Ok(raw as i64)));
    varint_type!(UInt32, u32, to_u64(|value| u64::from(value)), from_u64(|raw| narrow_u32(raw)));
    varint_type!(UInt64, u64, to_u64(|value| value), from_u64(|raw| Ok(raw)));
    varint_type!(
        SInt32,
        i32,
        to_u64(|value| u64::from(encode_zigzag32(value))),
        from_u64(|raw| narrow_zigzag32(raw))
    );
    varint_type!(
        SInt64,
        i64,
        to_u64(|value| encode_zigzag64(value)),
        from_u64(|raw| Ok(decode_zigzag64(raw)))
    );

    macro_rules! fixed_type {
        ($name:ident, $ty:ty, $width:literal, $put:ident, $get:ident) => {
            #[derive(Debug, Clone, Copy)]
            pub struct $name;

            impl Numeric for $name {
                type Value = $ty;
                const WIRE_TYPE: WireType = if $width == 4 {
                    WireType::ThirtyTwoBit
                } else {
                    WireType::SixtyFourBit
                };

                #[inline]
                fn put(value: $ty, buf: &mut impl BufMut) {
                    buf.$put(value);
                }

                #[inline]
                fn get(buf: &mut impl Buf) -> Result<$ty, DecodeError> {
                    if buf.remaining() < $width {
                        return Err(BufferUnderflow::new().into());
                    }
                    Ok(buf.$get())
                }

                #[inline]
                fn value_len(_: $ty) -> usize {
                    $width
                }
            }
        };
    }

    fixed_type!(Float, f32, 4, put_f32_le, get_f32_le);
    fixed_type!(Double, f64, 8, put_f64_le, get_f64_le);
    fixed_type!(Fixed32, u32, 4, put_u32_le, get_u32_le);
    fixed_type!(Fixed64, u64, 8, put_u64_le, get_u64_le);
    fixed_type!(SFixed32, i32, 4, put_i32_le, get_i32_le);
    fixed_type!(SFixed64, i64, 8, put_i64_le, get_i64_le);

    pub fn encode<N: Numeric>(tag: u32, value: &N::Value, buf: &mut impl BufMut) {
        encode_key(tag, N::WIRE_TYPE, buf);
        N::put(*value, buf);
    }

    pub fn merge<N: Numeric>(
        wire_type: WireType,
        value: &mut N::Value,
        buf: &mut impl Buf,
    ) -> Result<(), DecodeError> {
        check_wire_type(N::WIRE_TYPE, wire_type)?;
        *value = N::get(buf)?;
        Ok(())
    }

    pub fn encode_repeated<N: Numeric>(tag: u32, values: &[N::Value], buf: &mut impl BufMut) {
        for value in values {
            encode::<N>(tag, value, buf);
        }
    }

    /// Writes all values as one length-delimited run; nothing for an empty
    /// slice.
    pub fn encode_packed<N: Numeric>(tag: u32, values: &[N::Value], buf: &mut impl BufMut) {
        if values.is_empty() {
            return;
        }
        encode_key(tag, WireType::LengthDelimited, buf);
        encode_varint(payload_len::<N>(values) as u64, buf);
        for value in values {
            N::put(*value, buf);
        }
    }

    /// Appends one occurrence to `values`, accepting both the packed and the
    /// unpacked encoding.
    pub fn merge_repeated<N: Numeric, B: Buf>(
        wire_type: WireType,
        values: &mut Vec<N::Value>,
        buf: &mut B,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        if wire_type == WireType::LengthDelimited {
            merge_loop(values, buf, ctx, |values, buf, _| {
                values.push(N::get(buf)?);
                Ok(())
            })
        } else {
            check_wire_type(N::WIRE_TYPE, wire_type)?;
            values.push(N::get(buf)?);
            Ok(())
        }
    }

    #[inline]
    pub fn encoded_len<N: Numeric>(tag: u32, value: &N::Value) -> usize {
        key_len(tag) + N::value_len(*value)
    }

    #[inline]
    pub fn encoded_len_repeated<N: Numeric>(tag: u32, values: &[N::Value]) -> usize {
        key_len(tag) * values.len() + payload_len::<N>(values)
    }

    #[inline]
    pub fn encoded_len_packed<N: Numeric>(tag: u32, values: &[N::Value]) -> usize {
        if values.is_empty() {
            return 0;
        }
        let len = payload_len::<N>(values);
        key_len(tag) + encoded_len_varint(len as u64) + len
    }

    #[inline]
    fn payload_len<N: Numeric>(values: &[N::Value]) -> usize {
        values.iter().map(|value| N::value_len(*value)).sum()
    }
}

/// Emits the per-type module for a numeric field kind, forwarding to the
/// generic functions in [`numeric`].
macro_rules! numeric_field {
    ($(#[$attr:meta])* $module:ident, $codec:ident, $ty:ty) => {
        $(#[$attr])*
        pub mod $module {
            use super::numeric::{self, $codec};
            use super::*;

            #[inline]
            pub fn encode(tag: u32, value: &$ty, buf: &mut impl BufMut) {
                numeric::encode::<$codec>(tag, value, buf);
            }

            #[inline]
            pub fn merge(
                wire_type: WireType,
                value: &mut $ty,
                buf: &mut impl Buf,
                _ctx: DecodeContext,
            ) -> Result<(), DecodeError> {
                numeric::merge::<$codec>(wire_type, value, buf)
            }

            pub fn encode_repeated(tag: u32, values: &[$ty], buf: &mut impl BufMut) {
                numeric::encode_repeated::<$codec>(tag, values, buf);
            }

            pub fn encode_packed(tag: u32, values: &[$ty], buf: &mut impl BufMut) {
                numeric::encode_packed::<$codec>(tag, values, buf);
            }

            pub fn merge_repeated(
                wire_type: WireType,
                values: &mut Vec<$ty>,
                buf: &mut impl Buf,
                ctx: DecodeContext,
            ) -> Result<(), DecodeError> {
                numeric::merge_repeated::<$codec, _>(wire_type, values, buf, ctx)
            }

            #[inline]
            pub fn encoded_len(tag: u32, value: &$ty) -> usize {
                numeric::encoded_len::<$codec>(tag, value)
            }

            #[inline]
            pub fn encoded_len_repeated(tag: u32, values: &[$ty]) -> usize {
                numeric::encoded_len_repeated::<$codec>(tag, values)
            }

            #[inline]
            pub fn encoded_len_packed(tag: u32, values: &[$ty]) -> usize {
                numeric::encoded_len_packed::<$codec>(tag, values)
            }

        }
    };
}

numeric_field!(bool, Bool, bool);
numeric_field!(int32, Int32, i32);
numeric_field!(int64, Int64, i64);
numeric_field!(uint32, UInt32, u32);
numeric_field!(uint64, UInt64, u64);
numeric_field!(
    /// ZigZag encoded `i32`.
    sint32, SInt32, i32
);
numeric_field!(
    /// ZigZag encoded `i64`.
    sint64, SInt64, i64
);
numeric_field!(float, Float, f32);
numeric_field!(double, Double, f64);
numeric_field!(fixed32, Fixed32, u32);
numeric_field!(fixed64, Fixed64, u64);
numeric_field!(sfixed32, SFixed32, i32);
numeric_field!(sfixed64, SFixed64, i64);

/// Storage types accepted for `bytes` fields.
pub trait BytesField: Default + 'static {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the contents with the next `len` bytes of `buf`, copying at
    /// most once.
    fn replace_from(&mut self, buf: &mut impl Buf, len: usize);

    fn put_into(&self, buf: &mut impl BufMut);
}

impl BytesField for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn replace_from(&mut self, buf: &mut impl Buf, len: usize) {
        self.clear();
        self.reserve(len);
        self.put(buf.take(len));
    }

    fn put_into(&self, buf: &mut impl BufMut) {
        buf.put_slice(self);
    }
}

impl BytesField for Bytes {
    fn len(&self) -> usize {
        Bytes::len(self)
    }

    /// Shares the source allocation when `buf` is itself a `Bytes`.
    fn replace_from(&mut self, buf: &mut impl Buf, len: usize) {
        *self = buf.copy_to_bytes(len);
    }

    fn put_into(&self, buf: &mut impl BufMut) {
        buf.put_slice(self);
    }
}

/// Length-delimited helpers shared by `string` and `bytes`.
macro_rules! length_delimited {
    ($ty:ty) => {
        pub fn encode_repeated(tag: u32, values: &[$ty], buf: &mut impl BufMut) {
            for value in values {
                encode(tag, value, buf);
            }
        }

        pub fn merge_repeated(
            wire_type: WireType,
            values: &mut Vec<$ty>,
            buf: &mut impl Buf,
            ctx: DecodeContext,
        ) -> Result<(), DecodeError> {
            let mut value = Default::default();
            merge(wire_type, &mut value, buf, ctx)?;
            values.push(value);
            Ok(())
        }

        #[inline]
        pub fn encoded_len(tag: u32, value: &$ty) -> usize {
            key_len(tag) + encoded_len_varint(value.len() as u64) + value.len()
        }

        #[inline]
        pub fn encoded_len_repeated(tag: u32, values: &[$ty]) -> usize {
            values.iter().map(|value| encoded_len(tag, value)).sum()
        }
    };
}

pub mod string {
    use super::*;

    pub fn encode(tag: u32, value: &String, buf: &mut impl BufMut) {
        encode_key(tag, WireType::LengthDelimited, buf);
        encode_varint(value.len() as u64, buf);
        buf.put_slice(value.as_bytes());
    }

    /// Decodes a string field, replacing the current value.
    ///
    /// On any error, including invalid UTF-8, the field is left empty.
    pub fn merge(
        wire_type: WireType,
        value: &mut String,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        let mut raw = mem::take(value).into_bytes();
        bytes::merge(wire_type, &mut raw, buf, ctx)?;
        *value = String::from_utf8(raw).map_err(|_| DecodeError::from(InvalidString::new()))?;
        Ok(())
    }

    length_delimited!(String);

}

pub mod bytes {
    use super::*;

    pub fn encode(tag: u32, value: &impl BytesField, buf: &mut impl BufMut) {
        encode_key(tag, WireType::LengthDelimited, buf);
        encode_varint(value.len() as u64, buf);
        value.put_into(buf);
    }

    /// Decodes a bytes field. A later occurrence replaces an earlier one.
    pub fn merge(
        wire_type: WireType,
        value: &mut impl BytesField,
        buf: &mut impl Buf,
        _ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        check_wire_type(WireType::LengthDelimited, wire_type)?;
        let len = decode_len(buf)?;
        value.replace_from(buf, len);
        Ok(())
    }

    length_delimited!(impl BytesField);

    #[cfg(test)]
    mod test {
        use proptest::prelude::*;

        use super::super::test::check_field;
        use super::*;

        proptest! {
            #[test]
            fn vec(value: Vec<u8>, tag in MIN_TAG..=MAX_TAG) {
                check_field::<Vec<u8>, Vec<u8>>(value, tag, WireType::LengthDelimited,
                                                encode, merge, encoded_len)?;
            }

            #[test]
            fn shared(value: Vec<u8>, tag in MIN_TAG..=MAX_TAG) {
                check_field::<Bytes, Bytes>(Bytes::from(value), tag, WireType::LengthDelimited,
                                            encode, merge, encoded_len)?;
            }

            #[test]
            fn repeated(values: Vec<Vec<u8>>, tag in MIN_TAG..=MAX_TAG) {
                check_field(values, tag, WireType::LengthDelimited,
                            encode_repeated, merge_repeated, encoded_len_repeated)?;
            }
        }
    }
}

pub mod message {
    use super::*;

    /// Encodes a nested message.
    ///
    /// The length prefix comes from the message's size cache when it has
    /// one, so the cache must have been refreshed by [`Message::size`]. The
    /// top-level `encode` and `marshal` entry points do that.
    pub fn encode<M: Message>(tag: u32, msg: &M, buf: &mut impl BufMut) {
        encode_key(tag, WireType::LengthDelimited, buf);
        encode_varint(msg.cached_size() as u64, buf);
        msg.encode_raw(buf);
    }

    /// Merges one occurrence into `msg`. Repeated occurrences of a singular
    /// message field merge field by field.
    pub fn merge<M: Message, B: Buf>(
        wire_type: WireType,
        msg: &mut M,
        buf: &mut B,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        check_wire_type(WireType::LengthDelimited, wire_type)?;
        ctx.limit_reached()?;
        merge_loop(msg, buf, ctx.enter_recursion(), |msg, buf, mut ctx| {
            let (tag, wire_type) = ctx.read_key(buf)?;
            msg.merge_field(tag, wire_type, buf, ctx)
        })
    }

    pub fn encode_repeated<M: Message>(tag: u32, messages: &[M], buf: &mut impl BufMut) {
        for msg in messages {
            encode(tag, msg, buf);
        }
    }

    pub fn merge_repeated<M: Message + Default>(
        wire_type: WireType,
        messages: &mut Vec<M>,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        let mut msg = M::default();
        merge(wire_type, &mut msg, buf, ctx)?;
        messages.push(msg);
        Ok(())
    }

    /// Encoded length of a nested message, refreshing its size cache on the
    /// way.
    #[inline]
    pub fn encoded_len<M: Message>(tag: u32, msg: &M) -> usize {
        let len = msg.size();
        key_len(tag) + encoded_len_varint(len as u64) + len
    }

    #[inline]
    pub fn encoded_len_repeated<M: Message>(tag: u32, messages: &[M]) -> usize {
        messages.iter().map(|msg| encoded_len(tag, msg)).sum()
    }
}
