use caf_types::Digest;

use crate::error::StoreResult;

/// Content-keyed store of encoded bytes.
///
/// This is the seam the typed object layer ([`ObjectStore`](crate::ObjectStore))
/// sits on. Implementations must satisfy:
/// - `put` replaces whatever is stored under `digest`. Callers guarantee the
///   bytes actually hash to `digest`; the store does not check.
/// - `get` fails with [`StoreError::NotFound`](crate::StoreError::NotFound)
///   when nothing is stored under `digest`.
/// - `remove` of an absent key succeeds.
/// - All I/O errors are propagated, never silently ignored.
pub trait ContentStore: Send + Sync {
    /// Store `data` under `digest`.
    fn put(&self, digest: &Digest, data: &[u8]) -> StoreResult<()>;

    /// Read back everything stored under `digest`.
    fn get(&self, digest: &Digest) -> StoreResult<Vec<u8>>;

    /// Whether anything is stored under `digest`.
    fn contains(&self, digest: &Digest) -> StoreResult<bool>;

    /// Remove `digest`. Idempotent.
    fn remove(&self, digest: &Digest) -> StoreResult<()>;
}
