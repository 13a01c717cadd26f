use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use bytes::{Buf, BufMut, Bytes};

use crate::encoding::{self, DecodeContext, WireType};
use crate::{DecodeError, Message};

/// A message that declares extension ranges.
///
/// Tags inside [`Extendable::EXTENSION_RANGES`] are routed to the message's
/// [`Extensions`] while decoding instead of to its unknown fields. Their
/// values are read and written through an [`ExtensionDesc`].
pub trait Extendable: Message {
    /// The fully qualified name of the message, matched against
    /// [`ExtensionDesc::extendee`].
    const MESSAGE_NAME: &'static str;

    const EXTENSION_RANGES: &'static [RangeInclusive<u32>];

    fn extensions(&self) -> &Extensions;

    fn extensions_mut(&mut self) -> &mut Extensions;

    /// Returns `true` if `tag` falls inside one of the extension ranges.
    fn is_extension(tag: u32) -> bool
    where
        Self: Sized,
    {
        Self::EXTENSION_RANGES
            .iter()
            .any(|range| range.contains(&tag))
    }

    /// Decodes the value of an extension field, if present.
    fn get_extension<T>(&self, desc: &ExtensionDesc<T>) -> Result<Option<T>, ExtensionError>
    where
        Self: Sized,
        T: Default,
    {
        check_desc::<Self, T>(desc)?;
        self.extensions().get(desc).map_err(ExtensionError::Decode)
    }

    /// Replaces the value of an extension field.
    fn set_extension<T>(&mut self, desc: &ExtensionDesc<T>, value: &T) -> Result<(), ExtensionError>
    where
        Self: Sized,
    {
        check_desc::<Self, T>(desc)?;
        self.extensions_mut().set(desc, value);
        Ok(())
    }

    fn has_extension<T>(&self, desc: &ExtensionDesc<T>) -> bool
    where
        Self: Sized,
    {
        check_desc::<Self, T>(desc).is_ok() && self.extensions().has(desc.field)
    }

    /// Removes an extension field, returning `true` if it was present.
    fn clear_extension<T>(&mut self, desc: &ExtensionDesc<T>) -> bool
    where
        Self: Sized,
    {
        check_desc::<Self, T>(desc).is_ok() && self.extensions_mut().remove(desc.field)
    }
}

fn check_desc<M, T>(desc: &ExtensionDesc<T>) -> Result<(), ExtensionError>
where
    M: Extendable,
{
    if desc.extendee != M::MESSAGE_NAME {
        return Err(ExtensionError::WrongExtendee {
            extendee: desc.extendee,
            message: M::MESSAGE_NAME,
        });
    }
    if !M::is_extension(desc.field) {
        return Err(ExtensionError::OutOfRange { field: desc.field });
    }
    Ok(())
}

/// Describes one extension field: which message it extends, its number, and
/// how its value is encoded.
///
/// Descriptors are normally emitted as constants next to the generated
/// message code:
///
/// ```
/// use lazypb::encoding::int32;
/// use lazypb::ExtensionDesc;
///
/// const PRIORITY: ExtensionDesc<i32> = ExtensionDesc {
///     extendee: "example.Task",
///     name: "example.priority",
///     field: 100,
///     encode: int32::encode,
///     merge: int32::merge,
///     encoded_len: int32::encoded_len,
/// };
/// assert_eq!(PRIORITY.field, 100);
/// ```
pub struct ExtensionDesc<T> {
    pub extendee: &'static str,
    pub name: &'static str,
    pub field: u32,
    /// Encodes the value, including its key.
    pub encode: fn(u32, &T, &mut Vec<u8>),
    pub merge: fn(WireType, &mut T, &mut Bytes, DecodeContext) -> Result<(), DecodeError>,
    /// Encoded length of the value, including its key. Called before
    /// `encode`, so message values have fresh size caches when written.
    pub encoded_len: fn(u32, &T) -> usize,
}

impl<T> fmt::Debug for ExtensionDesc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionDesc")
            .field("extendee", &self.extendee)
            .field("name", &self.name)
            .field("field", &self.field)
            .finish()
    }
}

/// Encoded extension fields, keyed by field number.
///
/// Each entry holds every occurrence of the field exactly as it was decoded
/// (keys included), so extensions nobody asks about survive a round trip
/// unchanged. Entries are emitted in ascending field order.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Extensions {
    fields: BTreeMap<u32, Vec<u8>>,
}

impl Extensions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records an occurrence of an extension field whose key has just been
    /// read from `buf`.
    pub fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        let raw = self.fields.entry(tag).or_default();
        let start = raw.len();
        encoding::copy_key(tag, wire_type, &ctx, raw);
        let result = encoding::copy_field(wire_type, buf, raw);
        if result.is_err() {
            raw.truncate(start);
            if raw.is_empty() {
                self.fields.remove(&tag);
            }
        }
        result
    }

    /// Decodes the stored occurrences of `desc` with merge semantics: the
    /// last scalar wins, repeated values accumulate, and messages combine.
    pub fn get<T>(&self, desc: &ExtensionDesc<T>) -> Result<Option<T>, DecodeError>
    where
        T: Default,
    {
        let raw = match self.fields.get(&desc.field) {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let mut buf = Bytes::copy_from_slice(raw);
        let mut value = T::default();
        while buf.has_remaining() {
            let (_, wire_type) = encoding::decode_key(&mut buf)?;
            (desc.merge)(wire_type, &mut value, &mut buf, DecodeContext::default())?;
        }
        Ok(Some(value))
    }

    /// Replaces the stored occurrences of `desc` with the encoding of `value`.
    ///
    /// The value is sized first, as a top-level encode would be, so a message
    /// changed since its last `size()` is written with its current length.
    pub fn set<T>(&mut self, desc: &ExtensionDesc<T>, value: &T) {
        let len = (desc.encoded_len)(desc.field, value);
        let mut raw = Vec::with_capacity(len);
        (desc.encode)(desc.field, value, &mut raw);
        debug_assert_eq!(raw.len(), len);
        self.fields.insert(desc.field, raw);
    }

    pub fn has(&self, field: u32) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn remove(&mut self, field: u32) -> bool {
        self.fields.remove(&field).is_some()
    }

    /// The stored bytes of a field, keys included.
    pub fn raw(&self, field: u32) -> Option<&[u8]> {
        self.fields.get(&field).map(Vec::as_slice)
    }

    pub fn encode_raw(&self, buf: &mut impl BufMut) {
        for raw in self.fields.values() {
            buf.put_slice(raw);
        }
    }

    pub fn encoded_len(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.fields.keys()).finish()
    }
}

/// Misuse of an [`ExtensionDesc`], or a stored value that fails to decode.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionError {
    /// The descriptor extends a different message.
    WrongExtendee {
        extendee: &'static str,
        message: &'static str,
    },
    /// The descriptor's field number is outside the message's extension ranges.
    OutOfRange { field: u32 },
    Decode(DecodeError),
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionError::WrongExtendee { extendee, message } => {
                write!(f, "extension of {extendee} used with {message}")
            }
            ExtensionError::OutOfRange { field } => {
                write!(f, "field {field} is not in an extension range")
            }
            ExtensionError::Decode(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl std::error::Error for ExtensionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtensionError::Decode(error) => Some(error),
            _ => None,
        }
    }
}
