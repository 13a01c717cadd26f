#![doc(html_root_url = "https://docs.rs/lazypb/0.1.0")]

//! A Protocol Buffers wire runtime with a selector-driven lazy decoder.
//!
//! Two independent consumers share the primitives in [`encoding`]:
//!
//! * [`Message`] is the codec contract implemented by generated message
//!   types: two-phase encoding (`size`, then `marshal_to`), merge-style
//!   decoding, oneofs, unknown-field preservation and extensions.
//! * [`lazy`] walks an encoded buffer guided by a [`lazy::Def`] selector,
//!   capturing only the selected fields, and converts them to typed values
//!   on demand.

// Re-export the bytes crate for use within generated code.
pub use bytes;

mod error;
mod extension;
mod message;
mod oneof;
mod unknown;

#[doc(hidden)]
pub mod encoding;

pub mod lazy;

pub use crate::encoding::length_delimiter::{
    decode_length_delimiter, encode_length_delimiter, length_delimiter_len,
};
pub use crate::error::{
    decode_error_kind, DecodeError, DecodeErrorKind, EncodeError, ErrorPath, ErrorPathSegment,
};
pub use crate::extension::{Extendable, ExtensionDesc, ExtensionError, Extensions};
pub use crate::message::{Message, SizeCache};
pub use crate::oneof::{merge_variant, Oneof};
pub use crate::unknown::{UnknownField, UnknownFieldIter, UnknownFields};

/// Nesting depth a decode may reach before failing, unless the
/// `no-recursion-limit` feature is enabled. Matches the C++ runtime.
const RECURSION_LIMIT: u32 = 100;
