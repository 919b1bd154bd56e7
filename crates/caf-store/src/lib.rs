//! Content-addressable file store (CAF).
//!
//! An on-disk, hash-keyed object store in the spirit of git's
//! `.git/objects/` directory. Content is stored as plain files at
//! `root/xx/<sha1>`, and a small Merkle object model (blob → tree → commit)
//! is persisted in the same namespace.
//!
//! # Layers
//!
//! - [`path`] -- digest to sharded path, directory creation and permissions
//! - [`LockedFile`] -- exclusive advisory lock on one object's file, released on drop
//! - [`BlobStore`] -- save / open-for-reading / open-for-writing / delete
//! - [`Blob`], [`Tree`], [`TreeRecord`], [`Commit`] -- the object model
//! - [`codec`] -- canonical encoding and [`hash_object`]
//! - [`ObjectStore`] -- typed tree/commit persistence over any [`ContentStore`]
//!
//! # Design Rules
//!
//! 1. An object's path is a pure function of the store root and its digest.
//! 2. Every access to an object's file happens under that file's exclusive
//!    advisory lock, which serializes work on one digest across processes.
//! 3. Different digests never contend.
//! 4. Locks and handles are released on every exit path, including errors.
//! 5. Digests are trusted at write time; reads never re-hash.
//! 6. All I/O errors are propagated, never silently ignored.

pub mod blob;
pub mod codec;
pub mod config;
pub mod error;
pub mod lock;
pub mod memory;
pub mod object;
pub mod objects;
pub mod path;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use blob::BlobStore;
pub use codec::{hash_object, CodecError, HashObject};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use lock::LockedFile;
pub use memory::InMemoryContentStore;
pub use object::{Blob, Commit, Tree, TreeRecord, TreeRecordKind};
pub use objects::ObjectStore;
pub use path::{build_content_path, content_path};
pub use traits::ContentStore;

pub use caf_types::Digest;
