//! Bounded cache of recently used objects
//!
//! Two independent LRUs: one for decoded objects, one for inflated framed
//! bytes. Both sit in front of the loose and packed tiers; a miss is never
//! an error, it just falls through to disk.

use crate::artifacts::objects::object::GitObject;
use crate::artifacts::objects::object_id::ObjectId;
use bytes::Bytes;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Default capacity of each LRU
pub const DEFAULT_CAPACITY: usize = 512;

pub struct ValueCache {
    decoded: Mutex<LruCache<ObjectId, GitObject>>,
    inflated: Mutex<LruCache<ObjectId, Bytes>>,
}

impl std::fmt::Debug for ValueCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueCache").finish_non_exhaustive()
    }
}

impl ValueCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("non-zero capacity");
        ValueCache {
            decoded: Mutex::new(LruCache::new(capacity)),
            inflated: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn find(&self, oid: &ObjectId) -> Option<GitObject> {
        self.decoded.lock().expect("value cache poisoned").get(oid).cloned()
    }

    pub fn find_inflated(&self, oid: &ObjectId) -> Option<Bytes> {
        self.inflated.lock().expect("value cache poisoned").get(oid).cloned()
    }

    pub fn insert(&self, oid: ObjectId, object: GitObject) {
        self.decoded.lock().expect("value cache poisoned").put(oid, object);
    }

    pub fn insert_inflated(&self, oid: ObjectId, bytes: Bytes) {
        self.inflated.lock().expect("value cache poisoned").put(oid, bytes);
    }

    pub fn clear(&self) {
        self.decoded.lock().expect("value cache poisoned").clear();
        self.inflated.lock().expect("value cache poisoned").clear();
    }

    /// Change capacity, discarding all existing entries
    pub fn resize(&self, capacity: usize) {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("non-zero capacity");
        *self.decoded.lock().expect("value cache poisoned") = LruCache::new(capacity);
        *self.inflated.lock().expect("value cache poisoned") = LruCache::new(capacity);
    }
}

impl Default for ValueCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::blob::Blob;
    use crate::artifacts::objects::object::Object;

    fn blob(content: &'static [u8]) -> (ObjectId, GitObject) {
        let object = GitObject::Blob(Blob::new(Bytes::from_static(content)));
        (object.object_id().unwrap(), object)
    }

    #[test]
    fn test_find_returns_inserted_value() {
        let cache = ValueCache::default();
        let (oid, object) = blob(b"hello\n");

        cache.insert(oid.clone(), object.clone());
        pretty_assertions::assert_eq!(cache.find(&oid), Some(object));
    }

    #[test]
    fn test_eviction_at_capacity() {
        let cache = ValueCache::new(2);
        let (a, obj_a) = blob(b"a");
        let (b, obj_b) = blob(b"b");
        let (c, obj_c) = blob(b"c");

        cache.insert(a.clone(), obj_a);
        cache.insert(b.clone(), obj_b);
        cache.insert(c.clone(), obj_c);

        assert!(cache.find(&a).is_none());
        assert!(cache.find(&b).is_some());
        assert!(cache.find(&c).is_some());
    }

    #[test]
    fn test_resize_discards_entries() {
        let cache = ValueCache::default();
        let (oid, object) = blob(b"hello\n");
        cache.insert(oid.clone(), object);

        cache.resize(64);
        assert!(cache.find(&oid).is_none());
    }

    #[test]
    fn test_decoded_and_inflated_are_independent() {
        let cache = ValueCache::default();
        let (oid, object) = blob(b"hello\n");

        cache.insert(oid.clone(), object);
        assert!(cache.find_inflated(&oid).is_none());
    }
}
