use std::path::PathBuf;

use caf_types::Digest;
use tracing::debug;

use crate::blob::BlobStore;
use crate::codec::{decode_commit, decode_tree, encode_commit, encode_tree, CodecError};
use crate::error::{StoreError, StoreResult};
use crate::object::{Commit, Tree};
use crate::traits::ContentStore;

/// Typed persistence of trees and commits on top of a [`ContentStore`].
///
/// Objects are stored in their canonical encoding under the digest of that
/// encoding, in the same namespace and shard layout as blobs. With the
/// default [`BlobStore`] backend every save and load goes through the
/// per-object advisory lock.
#[derive(Debug)]
pub struct ObjectStore<S = BlobStore> {
    backend: S,
}

impl ObjectStore<BlobStore> {
    /// Filesystem-backed object store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::new(BlobStore::new(root))
    }
}

impl<S: ContentStore> ObjectStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    /// The underlying content store.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Persist `tree` and return its digest.
    pub fn save_tree(&self, tree: &Tree) -> StoreResult<Digest> {
        let bytes = encode_tree(tree);
        let digest = caf_crypto::digest_of_bytes(&bytes);
        self.backend.put(&digest, &bytes)?;
        debug!(digest = %digest, records = tree.len(), "saved tree");
        Ok(digest)
    }

    /// Persist `commit` and return its digest.
    pub fn save_commit(&self, commit: &Commit) -> StoreResult<Digest> {
        let bytes = encode_commit(commit);
        let digest = caf_crypto::digest_of_bytes(&bytes);
        self.backend.put(&digest, &bytes)?;
        debug!(digest = %digest, parents = commit.parents.len(), "saved commit");
        Ok(digest)
    }

    /// Load the tree stored under `digest`.
    pub fn load_tree(&self, digest: &Digest) -> StoreResult<Tree> {
        let bytes = self.backend.get(digest)?;
        decode_tree(&bytes).map_err(|e| corrupt(digest, e))
    }

    /// Load the commit stored under `digest`.
    pub fn load_commit(&self, digest: &Digest) -> StoreResult<Commit> {
        let bytes = self.backend.get(digest)?;
        decode_commit(&bytes).map_err(|e| corrupt(digest, e))
    }
}

fn corrupt(digest: &Digest, err: CodecError) -> StoreError {
    StoreError::CorruptObject {
        digest: digest.to_hex(),
        reason: err.to_string(),
    }
}
