use std::io;
use std::path::PathBuf;
use std::time::Duration;

use caf_crypto::HashError;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Empty root or digest, or a digest too short to shard.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Open, read, write, remove or directory-creation failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The exclusive lock was still held by someone else when the timeout ran out.
    #[error("timed out after {timeout:?} waiting for lock on {}", path.display())]
    LockTimeout { path: PathBuf, timeout: Duration },

    /// The lock call failed for a reason other than contention.
    #[error("failed to lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The digest backend failed.
    #[error("digest failure: {0}")]
    Crypto(String),

    /// A persisted tree or commit could not be decoded.
    #[error("corrupt object {digest}: {reason}")]
    CorruptObject { digest: String, reason: String },
}

impl From<HashError> for StoreError {
    fn from(err: HashError) -> Self {
        match err {
            HashError::Io(e) => Self::Io(e),
            HashError::Crypto(msg) => Self::Crypto(msg),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
