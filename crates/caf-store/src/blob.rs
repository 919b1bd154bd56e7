use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use caf_crypto::{digest_of_bytes, digest_of_file};
use caf_types::Digest;
use tracing::{debug, trace, warn};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::lock::LockedFile;
use crate::object::Blob;
use crate::path::{build_content_path, content_path, ensure_dir};
use crate::traits::ContentStore;

/// Sharded on-disk content store rooted at one directory.
///
/// Each object is a plain file at `root/xx/<digest>`. Every operation that
/// touches an object's file first takes that file's exclusive advisory lock
/// (see [`LockedFile`]), so readers, writers and deleters of the same digest
/// exclude one another across threads and processes, while different digests
/// never contend.
///
/// Content is trusted at write time: the store never re-hashes what it reads.
/// Writing bytes under a digest they do not hash to is a caller error that
/// goes undetected.
#[derive(Clone, Debug)]
pub struct BlobStore {
    root: PathBuf,
    config: StoreConfig,
}

impl BlobStore {
    /// Store rooted at `root` with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, StoreConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, config: StoreConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Copy the file at `source` into the store under its own digest.
    ///
    /// Existing content at that digest is overwritten under lock. If the copy
    /// fails, the partially written object is removed before the error is
    /// returned.
    pub fn save(&self, source: impl AsRef<Path>) -> StoreResult<Blob> {
        let source = source.as_ref();
        self.ensure_root()?;
        let digest = digest_of_file(source)?;
        let hex = digest.to_hex();

        // Truncating the destination would empty the source too.
        if is_same_file(source, &content_path(&self.root, &hex)?)? {
            debug!(digest = %digest, source = %source.display(), "source is the stored object");
            return Ok(Blob::new(digest));
        }

        let chunk_size = self.config.chunk_size.max(1);
        let written = self.write_content(&hex, |dest| {
            let src = File::open(source)?;
            copy_chunks(src, dest, chunk_size)
        })?;

        debug!(digest = %digest, source = %source.display(), bytes = written, "saved file content");
        Ok(Blob::new(digest))
    }

    /// Store an in-memory buffer under its own digest.
    pub fn save_bytes(&self, data: &[u8]) -> StoreResult<Blob> {
        let digest = digest_of_bytes(data);
        self.write_content(&digest.to_hex(), |dest| {
            dest.write_all(data)?;
            Ok(data.len() as u64)
        })?;
        debug!(digest = %digest, bytes = data.len(), "saved content");
        Ok(Blob::new(digest))
    }

    /// Open the object for `digest` for writing, creating it if absent.
    ///
    /// The returned handle already holds the object's exclusive lock and the
    /// file has been truncated under it. The caller is responsible for
    /// writing content that hashes to `digest`; dropping the handle releases
    /// the lock and closes the file.
    pub fn open_for_writing(&self, digest: impl AsRef<str>) -> StoreResult<LockedFile> {
        let digest = digest.as_ref();
        self.ensure_root()?;
        let path = build_content_path(&self.root, digest, self.config.dir_mode)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(self.config.file_mode);
        }

        let guard = self
            .lock_linked(&path, || options.open(&path))?
            .ok_or_else(|| StoreError::NotFound(digest.to_owned()))?;
        guard.set_len(0)?;
        trace!(digest, "opened for writing");
        Ok(guard)
    }

    /// Open the object for `digest` for reading.
    ///
    /// Readers take the same exclusive lock as writers, so a read never
    /// observes a write in progress. Fails with [`StoreError::NotFound`] if
    /// the object does not exist.
    pub fn open_for_reading(&self, digest: impl AsRef<str>) -> StoreResult<LockedFile> {
        let digest = digest.as_ref();
        let path = content_path(&self.root, digest)?;
        let guard = self
            .lock_linked(&path, || File::open(&path))?
            .ok_or_else(|| StoreError::NotFound(digest.to_owned()))?;
        trace!(digest, "opened for reading");
        Ok(guard)
    }

    /// Remove the object for `digest`. Removing an absent object succeeds.
    pub fn delete(&self, digest: impl AsRef<str>) -> StoreResult<()> {
        let digest = digest.as_ref();
        let path = content_path(&self.root, digest)?;
        let Some(_guard) = self.lock_linked(&path, || File::open(&path))? else {
            trace!(digest, "delete of absent object");
            return Ok(());
        };

        match fs::remove_file(&path) {
            Ok(()) => {}
            // Another deleter got there while we waited for the lock.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        debug!(digest, "deleted object");
        Ok(())
    }

    /// Whether an object exists for `digest`. Takes no lock.
    pub fn exists(&self, digest: impl AsRef<str>) -> StoreResult<bool> {
        let path = content_path(&self.root, digest.as_ref())?;
        Ok(path.try_exists()?)
    }

    /// Where the object for `digest` lives (or would live).
    pub fn path_of(&self, digest: impl AsRef<str>) -> StoreResult<PathBuf> {
        content_path(&self.root, digest.as_ref())
    }

    /// Open the file at `path` with `open` and lock it, starting over if the
    /// path no longer names the locked file by the time the lock is held.
    ///
    /// A waiter can queue behind a delete (or a failed write's cleanup) on an
    /// inode that is unlinked before the lock is handed over; writing to or
    /// reading from that inode would not touch the stored object. Returns
    /// `None` when `open` reports the path as missing.
    fn lock_linked<F>(&self, path: &Path, open: F) -> StoreResult<Option<LockedFile>>
    where
        F: Fn() -> io::Result<File>,
    {
        loop {
            let file = match open() {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let guard = LockedFile::acquire(file, path, &self.config)?;
            if is_linked_at(&guard, path)? {
                return Ok(Some(guard));
            }
            debug!(path = %path.display(), "object replaced while waiting for lock; retrying");
        }
    }

    fn ensure_root(&self) -> StoreResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(StoreError::InvalidArgument("empty store root".into()));
        }
        ensure_dir(&self.root, self.config.dir_mode)
    }

    /// Lock the destination for `digest`, let `fill` write it, and remove the
    /// partial object if anything goes wrong.
    fn write_content<F>(&self, digest: &str, fill: F) -> StoreResult<u64>
    where
        F: FnOnce(&mut LockedFile) -> StoreResult<u64>,
    {
        let mut dest = self.open_for_writing(digest)?;
        let result = fill(&mut dest).and_then(|written| {
            dest.flush()?;
            Ok(written)
        });

        if let Err(e) = &result {
            warn!(digest, error = %e, "write failed; removing partial object");
            if let Err(rm) = fs::remove_file(dest.path()) {
                warn!(digest, error = %rm, "could not remove partial object");
            }
        }
        result
    }
}

fn copy_chunks<R: Read, W: Write>(mut src: R, dest: &mut W, chunk_size: usize) -> StoreResult<u64> {
    let mut buf = vec![0u8; chunk_size];
    let mut total = 0u64;
    loop {
        let n = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        dest.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

fn metadata_if_exists(path: &Path) -> io::Result<Option<fs::Metadata>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn same_inode(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;

    a.dev() == b.dev() && a.ino() == b.ino()
}

/// Whether `held` is still the file linked at `path`.
#[cfg(unix)]
fn is_linked_at(held: &File, path: &Path) -> io::Result<bool> {
    let held = held.metadata()?;
    Ok(metadata_if_exists(path)?.is_some_and(|current| same_inode(&held, &current)))
}

#[cfg(not(unix))]
fn is_linked_at(_held: &File, path: &Path) -> io::Result<bool> {
    Ok(metadata_if_exists(path)?.is_some())
}

/// Whether `source` and `dest` name the same file. A missing `dest` never does.
#[cfg(unix)]
fn is_same_file(source: &Path, dest: &Path) -> io::Result<bool> {
    let Some(dest) = metadata_if_exists(dest)? else {
        return Ok(false);
    };
    Ok(same_inode(&fs::metadata(source)?, &dest))
}

#[cfg(not(unix))]
fn is_same_file(source: &Path, dest: &Path) -> io::Result<bool> {
    if metadata_if_exists(dest)?.is_none() {
        return Ok(false);
    }
    Ok(source.canonicalize()? == dest.canonicalize()?)
}

impl ContentStore for BlobStore {
    fn put(&self, digest: &Digest, data: &[u8]) -> StoreResult<()> {
        self.write_content(&digest.to_hex(), |dest| {
            dest.write_all(data)?;
            Ok(data.len() as u64)
        })?;
        Ok(())
    }

    fn get(&self, digest: &Digest) -> StoreResult<Vec<u8>> {
        let mut handle = self.open_for_reading(digest.to_hex())?;
        let mut data = Vec::new();
        handle.read_to_end(&mut data)?;
        Ok(data)
    }

    fn contains(&self, digest: &Digest) -> StoreResult<bool> {
        self.exists(digest.to_hex())
    }

    fn remove(&self, digest: &Digest) -> StoreResult<()> {
        self.delete(digest.to_hex())
    }
}
