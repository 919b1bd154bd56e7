//! Digest → filesystem path mapping.
//!
//! Every object lives at `root/<first two digest chars>/<digest>`, regardless
//! of whether it is a blob, a tree or a commit.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{trace, warn};

use crate::error::{StoreError, StoreResult};

/// Number of leading digest characters used as the shard directory name.
pub const SHARD_PREFIX_LEN: usize = 2;

/// Resolve the content path for `digest` under `root` without touching the
/// filesystem.
pub fn content_path(root: &Path, digest: &str) -> StoreResult<PathBuf> {
    let shard = shard_dir(root, digest)?;
    Ok(shard.join(digest))
}

/// Resolve the content path for `digest` under `root`, creating the shard
/// directory (with `dir_mode` permissions) if needed.
pub fn build_content_path(root: &Path, digest: &str, dir_mode: u32) -> StoreResult<PathBuf> {
    let shard = shard_dir(root, digest)?;
    ensure_dir(&shard, dir_mode)?;
    Ok(shard.join(digest))
}

/// Create `dir` (and any missing parents) and apply `mode`.
///
/// An existing directory is not an error. Failing to apply the mode is logged
/// and tolerated, since the directory may belong to another user.
pub fn ensure_dir(dir: &Path, mode: u32) -> StoreResult<()> {
    fs::create_dir_all(dir)?;
    apply_mode(dir, mode);
    Ok(())
}

fn shard_dir(root: &Path, digest: &str) -> StoreResult<PathBuf> {
    if root.as_os_str().is_empty() {
        return Err(StoreError::InvalidArgument("empty store root".into()));
    }
    if digest.is_empty() {
        return Err(StoreError::InvalidArgument("empty digest".into()));
    }
    if digest.len() < SHARD_PREFIX_LEN {
        return Err(StoreError::InvalidArgument(format!(
            "digest {digest:?} is shorter than the {SHARD_PREFIX_LEN}-character shard prefix"
        )));
    }
    if !digest.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(StoreError::InvalidArgument(format!(
            "digest {digest:?} contains characters outside [0-9A-Za-z]"
        )));
    }
    Ok(root.join(&digest[..SHARD_PREFIX_LEN]))
}

#[cfg(unix)]
fn apply_mode(dir: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;

    match fs::set_permissions(dir, fs::Permissions::from_mode(mode)) {
        Ok(()) => trace!(dir = %dir.display(), mode = %format!("{mode:o}"), "directory ready"),
        Err(e) => warn!(dir = %dir.display(), error = %e, "could not set directory permissions"),
    }
}

#[cfg(not(unix))]
fn apply_mode(dir: &Path, _mode: u32) {
    trace!(dir = %dir.display(), "directory ready");
}
