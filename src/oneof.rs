use bytes::{Buf, BufMut};

use crate::encoding::{DecodeContext, WireType};
use crate::DecodeError;

/// A set of fields sharing storage so that at most one is set at a time.
///
/// A message holds a oneof as `Option<O>` where `O` is an enum with one
/// variant per member field. Encoding writes only the active variant, and
/// decoding any member tag replaces whichever variant was active before.
pub trait Oneof: Sized + Send + Sync {
    /// The field numbers of all members.
    const TAGS: &'static [u32];

    /// Encodes the active variant, including its key.
    fn encode(&self, buf: &mut impl BufMut);

    /// Decodes a member field into `field`.
    ///
    /// `tag` must be one of [`Oneof::TAGS`].
    fn merge(
        field: &mut Option<Self>,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError>;

    /// Returns the encoded length of the active variant, including its key.
    fn encoded_len(&self) -> usize;

    /// The field number of the active variant.
    fn tag(&self) -> u32;

    /// Returns `true` if `tag` belongs to this oneof.
    fn contains(tag: u32) -> bool {
        Self::TAGS.contains(&tag)
    }
}

/// Merges one member of a oneof.
///
/// When the member is already the active variant its value is merged in
/// place (nested messages combine, scalars are overwritten); otherwise a
/// fresh value is decoded and replaces the active variant. Nothing changes if
/// decoding fails.
pub fn merge_variant<O, T, P, W, M>(
    field: &mut Option<O>,
    project: P,
    wrap: W,
    merge: M,
) -> Result<(), DecodeError>
where
    T: Default,
    P: FnOnce(&mut O) -> Option<&mut T>,
    W: FnOnce(T) -> O,
    M: FnOnce(&mut T) -> Result<(), DecodeError>,
{
    if let Some(value) = field.as_mut().and_then(project) {
        return merge(value);
    }
    let mut owned = T::default();
    merge(&mut owned)?;
    *field = Some(wrap(owned));
    Ok(())
}
