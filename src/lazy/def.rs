use std::collections::btree_map::{self, BTreeMap};

use log::debug;

use super::error::{DefViolation, InvalidDefError};
use crate::encoding::{FIRST_RESERVED_TAG, LAST_RESERVED_TAG, MAX_TAG};

/// Selects the fields a lazy decode captures.
///
/// Each tag maps either to nothing, meaning the field is captured as raw
/// scalar bytes, or to a nested `Def`, meaning the field holds a message
/// which is decoded recursively under that selector. Adding a tag twice has
/// no further effect.
///
/// Selectors are meant to be built once and then shared read-only by every
/// decode:
///
/// ```
/// use lazypb::lazy::Def;
///
/// let mut def = Def::new([1, 2]);
/// def.nested_tag(3, [1]).nested_tag(4, [7, 8]);
/// assert!(def.validate().is_ok());
/// assert_eq!(def.nested(3).and_then(|inner| inner.nested(4)).map(Def::len), Some(2));
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Def {
    tags: BTreeMap<i32, Option<Def>>,
}

impl Def {
    pub fn new(tags: impl IntoIterator<Item = i32>) -> Def {
        let mut def = Def::default();
        def.tags(tags);
        def
    }

    /// Adds scalar tags, returning `self` for chaining.
    ///
    /// A tag that already has a nested selector keeps it.
    pub fn tags(&mut self, tags: impl IntoIterator<Item = i32>) -> &mut Def {
        for tag in tags {
            self.tags.entry(tag).or_insert(None);
        }
        self
    }

    /// Creates a nested selector for `tag` holding `tags`, and returns it.
    ///
    /// Any earlier selection of `tag`, nested or not, is replaced.
    pub fn nested_tag(&mut self, tag: i32, tags: impl IntoIterator<Item = i32>) -> &mut Def {
        let slot = match self.tags.entry(tag) {
            btree_map::Entry::Vacant(entry) => entry.insert(None),
            btree_map::Entry::Occupied(entry) => entry.into_mut(),
        };
        slot.insert(Def::new(tags))
    }

    /// Looks up a tag: `None` if it is not selected, `Some(None)` if it is
    /// selected as a scalar, and `Some(Some(def))` if it is selected as a
    /// nested message.
    pub fn get(&self, tag: i32) -> Option<Option<&Def>> {
        self.tags.get(&tag).map(Option::as_ref)
    }

    pub fn contains(&self, tag: i32) -> bool {
        self.tags.contains_key(&tag)
    }

    /// The nested selector of `tag`, if it has one.
    pub fn nested(&self, tag: i32) -> Option<&Def> {
        self.tags.get(&tag).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterates the selected tags in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, Option<&Def>)> + '_ {
        self.tags.iter().map(|(tag, nested)| (*tag, nested.as_ref()))
    }

    /// Checks that every tag, at every depth, is a usable field number.
    ///
    /// The tree is walked depth-first in ascending tag order and the walk
    /// stops at the first offending tag. Tag `0` is accepted: it never
    /// occurs on the wire, so selecting it is harmless.
    pub fn validate(&self) -> Result<(), InvalidDefError> {
        let mut path = Vec::new();
        self.validate_at(&mut path).map_err(|error| {
            debug!("invalid selector: {}", error);
            error
        })
    }

    fn validate_at(&self, path: &mut Vec<i32>) -> Result<(), InvalidDefError> {
        for (&tag, nested) in &self.tags {
            if let Some(reason) = violation(tag) {
                return Err(InvalidDefError::new(tag, path.clone(), reason));
            }
            if let Some(nested) = nested {
                path.push(tag);
                nested.validate_at(path)?;
                path.pop();
            }
        }
        Ok(())
    }
}

fn violation(tag: i32) -> Option<DefViolation> {
    if tag < 0 {
        Some(DefViolation::Negative)
    } else if (FIRST_RESERVED_TAG..=LAST_RESERVED_TAG).contains(&(tag as u32)) {
        Some(DefViolation::Reserved)
    } else if tag as u32 > MAX_TAG {
        Some(DefViolation::TooLarge)
    } else {
        None
    }
}
