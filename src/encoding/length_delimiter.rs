use bytes::{Buf, BufMut};

use crate::encoding::varint::{decode_varint, encode_varint, encoded_len_varint};
use crate::error::decode_error_kind::LengthDelimiterTooLarge;
use crate::error::{DecodeError, EncodeError};

/// Writes the length prefix used by
/// [`Message::encode_length_delimited`](crate::Message::encode_length_delimited).
///
/// Fails without writing if `buf` has no room for the whole delimiter.
pub fn encode_length_delimiter(length: usize, buf: &mut impl BufMut) -> Result<(), EncodeError> {
    let length = length as u64;
    let required = encoded_len_varint(length);
    let remaining = buf.remaining_mut();
    if required > remaining {
        return Err(EncodeError::new(required, remaining));
    }
    encode_varint(length, buf);
    Ok(())
}

/// Width of the delimiter for `length`, between 1 and 10 bytes.
pub fn length_delimiter_len(length: usize) -> usize {
    encoded_len_varint(length as u64)
}

/// Reads the length prefix written by
/// [`Message::encode_length_delimited`](crate::Message::encode_length_delimited),
/// leaving the message itself in `buf`.
///
/// With fewer than 10 bytes available an error may only mean the delimiter
/// is incomplete. With 10 or more it means the delimiter is corrupt.
pub fn decode_length_delimiter(mut buf: impl Buf) -> Result<usize, DecodeError> {
    let length = decode_varint(&mut buf)?;
    if length > usize::MAX as u64 {
        return Err(LengthDelimiterTooLarge::new().into());
    }
    Ok(length as usize)
}
