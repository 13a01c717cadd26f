//! Little-endian fixed-width values, used for `fixed32`/`fixed64` fields and
//! as the bit pattern of `float`/`double`.

use bytes::BufMut;

use crate::error::decode_error_kind::BufferUnderflow;
use crate::DecodeError;

#[inline]
pub fn encode_fixed32(value: u32, buf: &mut impl BufMut) {
    buf.put_u32_le(value);
}

#[inline]
pub fn encode_fixed64(value: u64, buf: &mut impl BufMut) {
    buf.put_u64_le(value);
}

/// Decodes a little-endian `u32` from the front of the slice, returning the
/// value and the number of bytes read (always 4).
#[inline]
pub fn decode_fixed32(bytes: &[u8]) -> Result<(u32, usize), DecodeError> {
    match bytes.get(..4) {
        Some(head) => {
            let mut raw = [0; 4];
            raw.copy_from_slice(head);
            Ok((u32::from_le_bytes(raw), 4))
        }
        None => Err(BufferUnderflow::new().into()),
    }
}

/// Decodes a little-endian `u64` from the front of the slice, returning the
/// value and the number of bytes read (always 8).
#[inline]
pub fn decode_fixed64(bytes: &[u8]) -> Result<(u64, usize), DecodeError> {
    match bytes.get(..8) {
        Some(head) => {
            let mut raw = [0; 8];
            raw.copy_from_slice(head);
            Ok((u64::from_le_bytes(raw), 8))
        }
        None => Err(BufferUnderflow::new().into()),
    }
}
