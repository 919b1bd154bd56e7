use std::collections::HashMap;
use std::sync::RwLock;

use caf_types::Digest;

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. Bytes are held behind a `RwLock` and
/// cloned on read/write. There is no cross-process visibility.
pub struct InMemoryContentStore {
    objects: RwLock<HashMap<Digest, Vec<u8>>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Remove all objects from the store.
    pub fn clear(&self) {
        self.objects.write().expect("lock poisoned").clear();
    }

    /// All stored digests, sorted.
    pub fn digests(&self) -> Vec<Digest> {
        let map = self.objects.read().expect("lock poisoned");
        let mut digests: Vec<Digest> = map.keys().copied().collect();
        digests.sort();
        digests
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for InMemoryContentStore {
    fn put(&self, digest: &Digest, data: &[u8]) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        map.insert(*digest, data.to_vec());
        Ok(())
    }

    fn get(&self, digest: &Digest) -> StoreResult<Vec<u8>> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(digest)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(digest.to_hex()))
    }

    fn contains(&self, digest: &Digest) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(digest))
    }

    fn remove(&self, digest: &Digest) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        map.remove(digest);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryContentStore")
            .field("object_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caf_crypto::digest_of_bytes;

    fn put_bytes(store: &InMemoryContentStore, data: &[u8]) -> Digest {
        let digest = digest_of_bytes(data);
        store.put(&digest, data).unwrap();
        digest
    }

    #[test]
    fn put_and_get() {
        let store = InMemoryContentStore::new();
        let digest = put_bytes(&store, b"hello world");
        assert_eq!(store.get(&digest).unwrap(), b"hello world");
        assert!(store.contains(&digest).unwrap());
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = InMemoryContentStore::new();
        let digest = digest_of_bytes(b"never written");
        assert!(matches!(store.get(&digest), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn same_content_is_stored_once() {
        let store = InMemoryContentStore::new();
        let a = put_bytes(&store, b"identical");
        let b = put_bytes(&store, b"identical");
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let store = InMemoryContentStore::new();
        let digest = put_bytes(&store, b"to-remove");
        store.remove(&digest).unwrap();
        store.remove(&digest).unwrap();
        assert!(!store.contains(&digest).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn digests_are_sorted() {
        let store = InMemoryContentStore::new();
        for data in [&b"aaa"[..], b"bbb", b"ccc"] {
            put_bytes(&store, data);
        }
        let digests = store.digests();
        assert_eq!(digests.len(), 3);
        assert!(digests.windows(2).all(|w| w[0] <= w[1]));

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn debug_format() {
        let store = InMemoryContentStore::new();
        put_bytes(&store, b"x");
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryContentStore"));
        assert!(debug.contains("object_count"));
    }
}
