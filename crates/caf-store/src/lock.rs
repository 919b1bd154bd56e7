//! Cross-process exclusive locking of content files.
//!
//! Locks are `flock`-style advisory locks taken on the content file itself,
//! so they are honoured between threads holding separate handles as well as
//! between processes sharing the store root.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use fs4::fs_std::FileExt;
use tracing::{trace, warn};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

/// An open file holding an exclusive advisory lock.
///
/// Dropping the guard releases the lock and then closes the file, on every
/// exit path. Handles returned by
/// [`BlobStore::open_for_reading`](crate::BlobStore::open_for_reading) and
/// [`BlobStore::open_for_writing`](crate::BlobStore::open_for_writing) are
/// `LockedFile`s: the caller owns the unlock by owning the value.
#[derive(Debug)]
pub struct LockedFile {
    file: File,
    path: PathBuf,
}

impl LockedFile {
    /// Take an exclusive lock on `file`, retrying until `config.lock_timeout`.
    ///
    /// Each attempt is non-blocking; between attempts the thread sleeps for
    /// `config.lock_retry_interval`. Contention past the timeout yields
    /// [`StoreError::LockTimeout`]; any other lock failure is
    /// [`StoreError::Lock`]. On failure `file` is closed.
    pub fn acquire(file: File, path: impl Into<PathBuf>, config: &StoreConfig) -> StoreResult<Self> {
        let path = path.into();
        let start = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    trace!(path = %path.display(), attempts, "lock acquired");
                    return Ok(Self { file, path });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if start.elapsed() >= config.lock_timeout {
                        warn!(path = %path.display(), attempts, "lock timed out");
                        return Err(StoreError::LockTimeout {
                            path,
                            timeout: config.lock_timeout,
                        });
                    }
                    trace!(path = %path.display(), attempts, "lock busy; backing off");
                    thread::sleep(config.lock_retry_interval);
                }
                Err(e) => return Err(StoreError::Lock { path, source: e }),
            }
        }
    }

    /// Path of the locked file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "failed to release lock");
        } else {
            trace!(path = %self.path.display(), "lock released");
        }
    }
}

impl Deref for LockedFile {
    type Target = File;

    fn deref(&self) -> &Self::Target {
        &self.file
    }
}

impl DerefMut for LockedFile {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.file
    }
}

impl Read for LockedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for LockedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for LockedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}
