//! Base 128 varints.
//!
//! Each byte carries seven bits of the value, least significant group first,
//! with the high bit set on every byte but the last. A `u64` takes at most
//! ten bytes, and the tenth may only contribute the single top bit.

use bytes::{Buf, BufMut};

use crate::error::decode_error_kind::InvalidVarint;
use crate::DecodeError;

/// The maximum number of bytes a varint encoded `u64` can occupy.
pub const MAX_VARINT_LEN: usize = 10;

/// Writes `value` as a varint. The buffer needs room for up to 10 bytes.
#[inline]
pub fn encode_varint(mut value: u64, buf: &mut impl BufMut) {
    while value >= 0x80 {
        buf.put_u8(value as u8 | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Number of bytes `encode_varint` writes for `value`, between 1 and 10.
#[inline]
pub fn encoded_len_varint(value: u64) -> usize {
    // Significant bits rounded up to whole 7-bit groups, computed without a
    // division: ceil(bits / 7) == (bits * 9 + 64) / 64 for bits in 1..=64.
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits * 9 + 64) / 64
}

/// Reads a varint from the front of `buf`.
///
/// Decodes straight from the current chunk when the whole varint is known to
/// be inside it, and byte by byte across chunk boundaries otherwise.
#[inline]
pub fn decode_varint(buf: &mut impl Buf) -> Result<u64, DecodeError> {
    let chunk = buf.chunk();
    match chunk.first() {
        None => Err(InvalidVarint::new().into()),
        Some(&byte) if byte < 0x80 => {
            buf.advance(1);
            Ok(u64::from(byte))
        }
        Some(_) if chunk.len() >= MAX_VARINT_LEN || chunk[chunk.len() - 1] < 0x80 => {
            let (value, len) = decode_varint_slice(chunk)?;
            buf.advance(len);
            Ok(value)
        }
        Some(_) => decode_varint_across_chunks(buf),
    }
}

/// Reads a varint from the front of a contiguous slice, returning the value
/// and the number of bytes it occupied.
///
/// Fails if the slice ends before the varint does, if the varint is longer
/// than 10 bytes, or if its tenth byte overflows 64 bits.
#[inline]
pub fn decode_varint_slice(bytes: &[u8]) -> Result<(u64, usize), DecodeError> {
    let mut value = 0u64;
    for (i, &byte) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return check_last_byte(i, byte).map(|()| (value, i + 1));
        }
    }
    Err(InvalidVarint::new().into())
}

#[inline(never)]
#[cold]
fn decode_varint_across_chunks(buf: &mut impl Buf) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    let mut i = 0;
    while i < MAX_VARINT_LEN && buf.has_remaining() {
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return check_last_byte(i, byte).map(|()| value);
        }
        i += 1;
    }
    Err(InvalidVarint::new().into())
}

/// Only bit 63 is left for the tenth byte.
#[inline]
fn check_last_byte(index: usize, byte: u8) -> Result<(), DecodeError> {
    if index == MAX_VARINT_LEN - 1 && byte > 0x01 {
        return Err(InvalidVarint::new().into());
    }
    Ok(())
}
