use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, trace};
use parking_lot::Mutex;

use super::field_data::{FieldMap, Occurrence};

/// Number of maps a pool keeps by default.
pub const DEFAULT_MAX_RETAINED: usize = 64;

/// A pool of the maps that hold lazily decoded fields.
///
/// Every decode takes one map per message level from the pool, and returns
/// them all when its [`DecodeResult`](super::DecodeResult) is released. A
/// pool may be shared by any number of threads decoding independent buffers.
///
/// A disabled pool allocates a fresh map for every request and drops maps on
/// release, which is handy for checking that results do not depend on reuse.
pub struct MapPool {
    /// Cleared maps ready for reuse.
    maps: Mutex<Vec<FieldMap>>,

    /// Upper bound on `maps.len()`.
    max_retained: usize,

    /// Number of maps handed out.
    acquire_count: AtomicUsize,

    /// Number of maps handed out that were reused from the pool.
    hit_count: AtomicUsize,
}

impl MapPool {
    pub fn new() -> MapPool {
        MapPool::with_max_retained(DEFAULT_MAX_RETAINED)
    }

    /// A pool that keeps at most `max_retained` released maps.
    pub fn with_max_retained(max_retained: usize) -> MapPool {
        MapPool {
            maps: Mutex::new(Vec::new()),
            max_retained,
            acquire_count: AtomicUsize::new(0),
            hit_count: AtomicUsize::new(0),
        }
    }

    /// A pool that never reuses maps.
    pub fn disabled() -> MapPool {
        MapPool::with_max_retained(0)
    }

    pub fn is_disabled(&self) -> bool {
        self.max_retained == 0
    }

    /// Takes an empty map from the pool, allocating one if none is available.
    pub fn acquire(&self) -> FieldMap {
        self.acquire_count.fetch_add(1, Ordering::Relaxed);
        match self.maps.lock().pop() {
            Some(map) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                map
            }
            None => FieldMap::default(),
        }
    }

    /// Returns a map to the pool, together with every nested map reachable
    /// from it.
    pub fn release(&self, mut map: FieldMap) {
        for (_, mut field) in map.drain() {
            for occurrence in field.occurrences.drain(..) {
                if let Occurrence::Nested(nested) = occurrence {
                    self.release(nested);
                }
            }
        }

        let mut maps = self.maps.lock();
        if maps.len() < self.max_retained {
            maps.push(map);
        } else if self.max_retained > 0 {
            trace!("map pool full, dropping map");
        }
    }

    /// Number of maps handed out so far.
    pub fn acquire_count(&self) -> usize {
        self.acquire_count.load(Ordering::Relaxed)
    }

    /// Number of maps handed out that were reused rather than allocated.
    pub fn hit_count(&self) -> usize {
        self.hit_count.load(Ordering::Relaxed)
    }

    /// Number of maps currently waiting in the pool.
    pub fn retained(&self) -> usize {
        self.maps.lock().len()
    }
}

impl Default for MapPool {
    fn default() -> Self {
        MapPool::new()
    }
}

impl std::fmt::Debug for MapPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapPool")
            .field("max_retained", &self.max_retained)
            .field("retained", &self.retained())
            .field("acquire_count", &self.acquire_count())
            .field("hit_count", &self.hit_count())
            .finish()
    }
}

impl Drop for MapPool {
    fn drop(&mut self) {
        debug!(
            "map pool dropped: {} acquired, {} reused, {} retained",
            self.acquire_count(),
            self.hit_count(),
            self.maps.get_mut().len()
        );
    }
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::*;
    use crate::encoding::WireType;
    use crate::lazy::field_data::FieldData;

    fn field(occurrences: Vec<Occurrence>) -> FieldData {
        FieldData {
            wire_type: WireType::LengthDelimited,
            occurrences,
        }
    }

    #[test]
    fn reuses_released_maps() {
        let pool = MapPool::new();
        let map = pool.acquire();
        assert_eq!(pool.hit_count(), 0);
        pool.release(map);
        assert_eq!(pool.retained(), 1);

        let map = pool.acquire();
        assert!(map.is_empty());
        assert_eq!(pool.acquire_count(), 2);
        assert_eq!(pool.hit_count(), 1);
        assert_eq!(pool.retained(), 0);
    }

    #[test]
    fn release_is_recursive() {
        let pool = MapPool::new();
        let mut inner = pool.acquire();
        inner.insert(
            1,
            field(vec![Occurrence::Scalar(
                WireType::LengthDelimited,
                Bytes::from_static(b"x"),
            )]),
        );
        let mut outer = pool.acquire();
        outer.insert(2, field(vec![Occurrence::Nested(inner)]));

        pool.release(outer);
        assert_eq!(pool.retained(), 2);
        assert!(pool.acquire().is_empty());
        assert!(pool.acquire().is_empty());
    }

    #[test]
    fn bounded_and_disabled() {
        let pool = MapPool::with_max_retained(1);
        pool.release(FieldMap::default());
        pool.release(FieldMap::default());
        assert_eq!(pool.retained(), 1);

        let pool = MapPool::disabled();
        assert!(pool.is_disabled());
        pool.release(FieldMap::default());
        assert_eq!(pool.retained(), 0);
        pool.acquire();
        assert_eq!(pool.hit_count(), 0);
    }
}
