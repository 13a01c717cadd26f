//! ZigZag mapping between signed and unsigned integers.
//!
//! Small-magnitude negative numbers map to small unsigned numbers, so they
//! stay short once varint encoded: `0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, ...`.

#[inline]
pub fn encode_zigzag32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

#[inline]
pub fn decode_zigzag32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ (-((value & 1) as i32))
}

#[inline]
pub fn encode_zigzag64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub fn decode_zigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ (-((value & 1) as i64))
}
