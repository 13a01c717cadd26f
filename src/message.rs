use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::{Buf, BufMut};

use crate::encoding::varint::encode_varint;
use crate::encoding::{encoded_len_varint, message, DecodeContext, WireType};
use crate::{DecodeError, EncodeError};

/// A Protobuf message.
///
/// Implementations are normally emitted by a code generator. They provide the
/// four required methods; everything else (`size`, `marshal`, `unmarshal`,
/// the length-delimited variants) is built on top of them here.
///
/// Fields are encoded in declaration order, followed by any preserved
/// extension and unknown-field bytes.
pub trait Message: Send + Sync {
    /// Writes the fields without a length prefix.
    ///
    /// Panics if `buf` runs out of space. Every nested size cache must be
    /// fresh.
    ///
    /// Meant to be used only by `Message` implementations.
    #[doc(hidden)]
    fn encode_raw(&self, buf: &mut impl BufMut)
    where
        Self: Sized;

    /// Merges one field whose key has already been read.
    ///
    /// Unknown tags are skipped or preserved, never rejected.
    #[doc(hidden)]
    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized;

    /// Encoded length without a length prefix, recomputed from the fields.
    fn encoded_len(&self) -> usize;

    /// Clears the message, resetting all fields to their default.
    fn clear(&mut self);

    /// The message's size cache, if it carries one.
    fn size_cache(&self) -> Option<&SizeCache> {
        None
    }

    /// Computes the encoded length of the message and records it in the size
    /// cache.
    ///
    /// Nested messages record their own sizes while this runs, so a following
    /// `encode_raw` never recomputes them.
    fn size(&self) -> usize {
        let len = self.encoded_len();
        if let Some(cache) = self.size_cache() {
            cache.set(len);
        }
        len
    }

    /// Returns the size recorded by the last call to [`Message::size`], or
    /// computes it if the message carries no cache or it was never filled.
    fn cached_size(&self) -> usize {
        match self.size_cache().and_then(SizeCache::get) {
            Some(len) => len,
            None => self.encoded_len(),
        }
    }

    /// Encodes the message to a newly allocated buffer of exactly
    /// [`Message::size`] bytes.
    fn marshal(&self) -> Vec<u8>
    where
        Self: Sized,
    {
        let mut buf = Vec::with_capacity(self.size());
        self.encode_raw(&mut buf);
        buf
    }

    /// Encodes the message into the front of `buf`, returning the number of
    /// bytes written.
    ///
    /// An error will be returned if the buffer is shorter than the message.
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, EncodeError>
    where
        Self: Sized,
    {
        let required = self.size();
        if required > buf.len() {
            return Err(EncodeError::new(required, buf.len()));
        }
        let mut dst = &mut buf[..required];
        self.encode_raw(&mut dst);
        Ok(required)
    }

    /// Appends the encoding to `buf`, failing without writing anything if
    /// it does not fit.
    fn encode(&self, buf: &mut impl BufMut) -> Result<(), EncodeError>
    where
        Self: Sized,
    {
        let required = self.size();
        let remaining = buf.remaining_mut();
        if required > remaining {
            return Err(EncodeError::new(required, remaining));
        }

        self.encode_raw(buf);
        Ok(())
    }

    /// Same as [`Message::marshal`].
    fn encode_to_vec(&self) -> Vec<u8>
    where
        Self: Sized,
    {
        self.marshal()
    }

    /// Appends the encoding preceded by its length as a varint, for framing
    /// several messages in one stream.
    fn encode_length_delimited(&self, buf: &mut impl BufMut) -> Result<(), EncodeError>
    where
        Self: Sized,
    {
        let len = self.size();
        let required = len + encoded_len_varint(len as u64);
        let remaining = buf.remaining_mut();
        if required > remaining {
            return Err(EncodeError::new(required, remaining));
        }
        encode_varint(len as u64, buf);
        self.encode_raw(buf);
        Ok(())
    }

    /// Decodes a message occupying all of `buf`.
    fn decode(buf: impl Buf) -> Result<Self, DecodeError>
    where
        Self: Default,
    {
        let mut message = Self::default();
        Self::merge(&mut message, buf).map(|_| message)
    }

    /// Decodes one message framed by [`Message::encode_length_delimited`].
    fn decode_length_delimited(buf: impl Buf) -> Result<Self, DecodeError>
    where
        Self: Default,
    {
        let mut message = Self::default();
        message.merge_length_delimited(buf)?;
        Ok(message)
    }

    /// Resets the message and decodes the entire buffer into it.
    ///
    /// On error the message is left cleared; a partially decoded value is
    /// never observable.
    fn unmarshal(&mut self, buf: impl Buf) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        self.clear();
        let result = self.merge(buf);
        if result.is_err() {
            self.clear();
        }
        result
    }

    /// Merges all of `buf` into `self`. Singular fields present in `buf`
    /// overwrite, repeated fields append, and nested messages merge.
    fn merge(&mut self, mut buf: impl Buf) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        let mut ctx = DecodeContext::default();
        while buf.has_remaining() {
            let (tag, wire_type) = ctx.read_key(&mut buf)?;
            self.merge_field(tag, wire_type, &mut buf, ctx)?;
        }
        Ok(())
    }

    /// Merges one length-prefixed message from the front of `buf`.
    fn merge_length_delimited(&mut self, mut buf: impl Buf) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        message::merge(
            WireType::LengthDelimited,
            self,
            &mut buf,
            DecodeContext::default(),
        )
    }
}

impl<M> Message for Box<M>
where
    M: Message,
{
    fn encode_raw(&self, buf: &mut impl BufMut) {
        (**self).encode_raw(buf)
    }
    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        (**self).merge_field(tag, wire_type, buf, ctx)
    }
    fn encoded_len(&self) -> usize {
        (**self).encoded_len()
    }
    fn clear(&mut self) {
        (**self).clear()
    }
    fn size_cache(&self) -> Option<&SizeCache> {
        (**self).size_cache()
    }
}

const UNSET: usize = usize::MAX;

/// The last size computed for a message instance.
///
/// Stored atomically, so concurrent `size`/`marshal` calls on the same
/// unchanged message from several threads each write the same value without
/// racing. It does not track mutation: any top-level encode recomputes it.
///
/// Two caches always compare equal, so a derived `PartialEq` on the owning
/// message ignores it.
pub struct SizeCache(AtomicUsize);

impl SizeCache {
    pub const fn new() -> SizeCache {
        SizeCache(AtomicUsize::new(UNSET))
    }

    /// Returns the cached size, if one was recorded since the last reset.
    #[inline]
    pub fn get(&self) -> Option<usize> {
        match self.0.load(Ordering::Acquire) {
            UNSET => None,
            len => Some(len),
        }
    }

    #[inline]
    pub fn set(&self, len: usize) {
        debug_assert!(len != UNSET);
        self.0.store(len, Ordering::Release);
    }

    #[inline]
    pub fn reset(&self) {
        self.0.store(UNSET, Ordering::Release);
    }
}

impl Default for SizeCache {
    fn default() -> SizeCache {
        SizeCache::new()
    }
}

impl Clone for SizeCache {
    fn clone(&self) -> SizeCache {
        SizeCache(AtomicUsize::new(self.0.load(Ordering::Acquire)))
    }
}

impl PartialEq for SizeCache {
    fn eq(&self, _: &SizeCache) -> bool {
        true
    }
}

impl Eq for SizeCache {}

impl fmt::Debug for SizeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SizeCache").field(&self.get()).finish()
    }
}
