use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for a [`BlobStore`](crate::BlobStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// How long a store operation waits for an object's lock before failing.
    pub lock_timeout: Duration,
    /// Back-off between non-blocking lock attempts.
    pub lock_retry_interval: Duration,
    /// Buffer size used when copying content into the store.
    pub chunk_size: usize,
    /// Permission bits for the root and shard directories.
    pub dir_mode: u32,
    /// Permission bits for newly created content files.
    pub file_mode: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(10),
            lock_retry_interval: Duration::from_secs(1),
            chunk_size: caf_crypto::CHUNK_SIZE,
            dir_mode: 0o755,
            file_mode: 0o644,
        }
    }
}

impl StoreConfig {
    /// Same as the default but with a different lock timeout.
    pub fn with_lock_timeout(timeout: Duration) -> Self {
        Self {
            lock_timeout: timeout,
            ..Default::default()
        }
    }
}
