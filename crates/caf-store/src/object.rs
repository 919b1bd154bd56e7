use std::fmt;

use caf_types::Digest;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw stored content, identified by the digest it was saved under.
///
/// Blobs are produced by [`BlobStore::save`](crate::BlobStore::save) and
/// friends; the value carries the digest only, never the bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Blob {
    digest: Digest,
}

impl Blob {
    pub fn new(digest: Digest) -> Self {
        Self { digest }
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// What a tree record points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeRecordKind {
    /// A subtree (directory).
    Tree,
    /// File content.
    Blob,
    /// A commit (e.g. a nested repository snapshot).
    Commit,
}

impl TreeRecordKind {
    /// Tag byte used by the canonical encoding.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Tree => 1,
            Self::Blob => 2,
            Self::Commit => 3,
        }
    }

    /// Parse a tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Tree),
            2 => Some(Self::Blob),
            3 => Some(Self::Commit),
            _ => None,
        }
    }
}

impl fmt::Display for TreeRecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree => write!(f, "tree"),
            Self::Blob => write!(f, "blob"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// One named entry of a tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeRecord {
    pub kind: TreeRecordKind,
    /// Digest of the referenced object.
    pub digest: Digest,
    pub name: String,
}

impl TreeRecord {
    pub fn new(kind: TreeRecordKind, digest: Digest, name: impl Into<String>) -> Self {
        Self {
            kind,
            digest,
            name: name.into(),
        }
    }

    pub fn tree(digest: Digest, name: impl Into<String>) -> Self {
        Self::new(TreeRecordKind::Tree, digest, name)
    }

    pub fn blob(digest: Digest, name: impl Into<String>) -> Self {
        Self::new(TreeRecordKind::Blob, digest, name)
    }

    pub fn commit(digest: Digest, name: impl Into<String>) -> Self {
        Self::new(TreeRecordKind::Commit, digest, name)
    }
}

/// Directory-like snapshot: an ordered list of records.
///
/// Order is significant. Records are kept exactly as inserted and the tree's
/// digest covers that order, so two trees holding the same records in a
/// different order are different objects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    records: Vec<TreeRecord>,
}

impl Tree {
    pub fn new(records: Vec<TreeRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: TreeRecord) {
        self.records.push(record);
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[TreeRecord] {
        &self.records
    }

    /// First record with the given name.
    pub fn get(&self, name: &str) -> Option<&TreeRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<TreeRecord> for Tree {
    fn from_iter<I: IntoIterator<Item = TreeRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// A snapshot of one tree plus its place in history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Root tree of the snapshot.
    pub tree: Digest,
    /// Parent commits, in order. Empty for a root commit; more than one for a merge.
    pub parents: Vec<Digest>,
    pub author: String,
    pub message: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

impl Commit {
    pub fn new(
        tree: Digest,
        parents: Vec<Digest>,
        author: impl Into<String>,
        message: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            tree,
            parents,
            author: author.into(),
            message: message.into(),
            timestamp,
        }
    }

    /// Like [`Commit::new`], stamped with the current time.
    pub fn now(
        tree: Digest,
        parents: Vec<Digest>,
        author: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(tree, parents, author, message, chrono::Utc::now().timestamp())
    }

    /// Returns `true` if this commit has no parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}
