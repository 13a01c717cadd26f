//! Errors returned by encoding and decoding.

use std::error::Error;
use std::fmt;
use std::iter::Rev;
use std::slice;

pub use decode_error_kind::DecodeErrorKind;

/// The input is not a valid encoding of the message being decoded.
///
/// Carries what went wrong as a [`DecodeErrorKind`] and, for errors raised
/// inside nested messages, the chain of fields leading to the failure.
/// Malformed data rarely has a single provable cause, so the kind is the
/// first violation the decoder ran into.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodeError {
    inner: Box<Inner>,
}

#[derive(Clone, PartialEq, Eq)]
struct Inner {
    kind: DecodeErrorKind,
    /// Pushed innermost first while the error unwinds.
    path: ErrorPath,
}

impl DecodeError {
    pub fn kind(&self) -> &DecodeErrorKind {
        &self.inner.kind
    }

    /// The fields being decoded when the error occurred.
    pub fn path(&self) -> &ErrorPath {
        &self.inner.path
    }

    /// Records that the error passed through `message.field`.
    ///
    /// Called by `Message::merge_field` implementations as the error
    /// propagates outwards.
    #[doc(hidden)]
    pub fn push(&mut self, message: &'static str, field: &'static str, tag: u32) {
        self.inner
            .path
            .segments
            .push(ErrorPathSegment::new(message, field, tag));
    }
}

/// The fields, outermost first, that lead from the top-level message to the
/// point where decoding failed. Empty if it failed at the top level.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ErrorPath {
    segments: Vec<ErrorPathSegment>,
}

impl ErrorPath {
    pub fn new() -> Self {
        ErrorPath::default()
    }

    /// Iterates outermost first.
    pub fn iter(&self) -> Rev<slice::Iter<'_, ErrorPathSegment>> {
        self.segments.iter().rev()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

impl<'a> IntoIterator for &'a ErrorPath {
    type Item = &'a ErrorPathSegment;
    type IntoIter = Rev<slice::Iter<'a, ErrorPathSegment>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One field on an [`ErrorPath`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ErrorPathSegment {
    message: &'static str,
    field: &'static str,
    tag: u32,
}

impl ErrorPathSegment {
    #[doc(hidden)]
    pub fn new(message: &'static str, field: &'static str, tag: u32) -> Self {
        ErrorPathSegment {
            message,
            field,
            tag,
        }
    }

    /// Name of the message type declaring the field.
    pub fn message(&self) -> &'static str {
        self.message
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }
}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeError")
            .field("kind", &self.inner.kind)
            .field("path", &self.path())
            .finish()
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode Protobuf message")?;
        for segment in self.path() {
            write!(f, ": {}.{} (tag {})", segment.message, segment.field, segment.tag)?;
        }
        write!(f, ": {}", self.inner.kind)
    }
}

impl From<DecodeErrorKind> for DecodeError {
    fn from(kind: DecodeErrorKind) -> Self {
        DecodeError {
            inner: Box::new(Inner {
                kind,
                path: ErrorPath::new(),
            }),
        }
    }
}

pub mod decode_error_kind {
    use super::*;
    use crate::encoding::WireType;

    /// Declares one struct per failure kind, plus the `DecodeErrorKind` enum
    /// wrapping them all.
    macro_rules! decode_error_kinds {
        {
            $(
                $(#[doc = $doc:literal])?
                #[description($description:literal)]
                pub struct $name:ident {
                    $(
                        #[get($field_get:ty)]
                        $field:ident: $field_type:ty
                    ),*$(,)?
                }
            )*
        } => {
            #[derive(Clone, Debug, PartialEq, Eq)]
            #[non_exhaustive]
            pub enum DecodeErrorKind {
                $(
                    $(#[doc = $doc])?
                    $name($name),
                )*
            }

            impl DecodeErrorKind {
                pub fn inner(&self) -> &(dyn Error + 'static) {
                    match self {
                        $(Self::$name(inner) => inner,)*
                    }
                }
            }

            impl fmt::Display for DecodeErrorKind {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    match self {
                        $(Self::$name(inner) => fmt::Display::fmt(inner, f),)*
                    }
                }
            }

            $(
                $(#[doc = $doc])?
                #[derive(Debug, Clone, PartialEq, Eq)]
                #[non_exhaustive]
                pub struct $name {
                    $(
                        $field: $field_type,
                    )*
                }

                impl $name {
                    #[doc(hidden)]
                    pub fn new($($field: $field_type,)*) -> Self {
                        Self {
                            $($field,)*
                        }
                    }

                    pub fn into_decode_error(self) -> super::DecodeError {
                        super::DecodeError::from(super::DecodeErrorKind::$name(self))
                    }

                    $(
                        pub fn $field(&self) -> $field_get {
                            self.$field
                        }
                    )*
                }

                impl fmt::Display for $name {
                    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        write!(f, $description, $($field = self.$field,)*)
                    }
                }

                impl Error for $name {}

                impl From<$name> for DecodeErrorKind {
                    fn from(value: $name) -> Self {
                        DecodeErrorKind::$name(value)
                    }
                }

                impl From<$name> for DecodeError {
                    fn from(value: $name) -> Self {
                        value.into_decode_error()
                    }
                }
            )*
        };
    }

    decode_error_kinds! {
        /// A length delimiter does not fit `usize`
        #[description("length delimiter exceeds maximum usize value")]
        pub struct LengthDelimiterTooLarge {}

        /// Malformed varint: truncated, longer than 10 bytes, or overflowing 64 bits
        #[description("invalid varint")]
        pub struct InvalidVarint {}

        /// Messages are nested deeper than the recursion limit allows
        #[description("recursion limit reached")]
        pub struct RecursionLimitReached {}

        /// The low three bits of a key are not a supported wire type
        #[description("invalid wire type value: {value}")]
        pub struct InvalidWireType {
            #[get(u64)]
            value: u64,
        }

        /// A key does not fit 32 bits
        #[description("invalid key value: {key}")]
        pub struct InvalidKey {
            #[get(u64)]
            key: u64,
        }

        /// A key carries field number 0
        #[description("invalid tag value: 0")]
        pub struct InvalidTag {}

        /// Wire type found on the wire differs from the declared one
        #[description("invalid wire type: {actual} (expected {expected})")]
        pub struct UnexpectedWireType {
            #[get(WireType)]
            actual: WireType,
            #[get(WireType)]
            expected: WireType,
        }

        /// The input ends inside a value
        #[description("buffer underflow")]
        pub struct BufferUnderflow {}

        /// A nested value reads past the end of its enclosing length prefix
        #[description("delimited length exceeded")]
        pub struct DelimitedLengthExceeded {}

        /// A string field is not UTF-8
        #[description("invalid string value: data is not UTF-8 encoded")]
        pub struct InvalidString {}

        /// A decoded integer does not fit the narrower target type
        #[description("value {value:#x} overflows {target}")]
        pub struct ValueOverflow {
            #[get(u64)]
            value: u64,
            #[get(&'static str)]
            target: &'static str,
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner.kind.inner())
    }
}

impl From<DecodeError> for std::io::Error {
    fn from(error: DecodeError) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::InvalidData, error)
    }
}

/// The output buffer is too small for the encoded message.
///
/// Encoding cannot fail in any other way.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EncodeError {
    required: usize,
    remaining: usize,
}

impl EncodeError {
    pub(crate) fn new(required: usize, remaining: usize) -> EncodeError {
        EncodeError {
            required,
            remaining,
        }
    }

    /// Bytes needed to hold the encoding.
    pub fn required_capacity(&self) -> usize {
        self.required
    }

    /// Bytes that were left in the buffer.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to encode Protobuf message; insufficient buffer capacity (required: {}, remaining: {})",
            self.required, self.remaining
        )
    }
}

impl Error for EncodeError {}

impl From<EncodeError> for std::io::Error {
    fn from(error: EncodeError) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, error)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encoding::WireType;

    #[test]
    fn path_is_rendered_outermost_first() {
        let mut decode_error: DecodeError =
            decode_error_kind::UnexpectedWireType::new(WireType::LengthDelimited, WireType::Varint)
                .into();
        decode_error.push("Inner", "value", 1);
        decode_error.push("Outer", "inner", 3);

        assert_eq!(
            decode_error.to_string(),
            "failed to decode Protobuf message: Outer.inner (tag 3): Inner.value (tag 1): \
             invalid wire type: length-delimited (expected varint)"
        );
        let tags: Vec<u32> = decode_error.path().iter().map(ErrorPathSegment::tag).collect();
        assert_eq!(tags, vec![3, 1]);
        assert_eq!(
            decode_error.source().unwrap().to_string(),
            "invalid wire type: length-delimited (expected varint)"
        );
    }

    #[test]
    fn overflow_display() {
        let error: DecodeError = decode_error_kind::ValueOverflow::new(1 << 40, "int32").into();
        assert_eq!(error.kind().to_string(), "value 0x10000000000 overflows int32");
        assert!(error.path().is_empty());
    }

    #[test]
    fn converts_to_io_error() {
        let decode_error = decode_error_kind::InvalidVarint::new().into_decode_error();
        let std_io_error = std::io::Error::from(decode_error);

        assert_eq!(std_io_error.kind(), std::io::ErrorKind::InvalidData);
        assert_eq!(
            std_io_error.to_string(),
            "failed to decode Protobuf message: invalid varint"
        );
    }

    #[test]
    fn encode_error_accessors() {
        let error = EncodeError::new(10, 4);
        assert_eq!(error.required_capacity(), 10);
        assert_eq!(error.remaining(), 4);
        let io: std::io::Error = error.into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidInput);
    }
}
