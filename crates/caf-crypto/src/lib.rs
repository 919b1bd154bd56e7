//! Hashing engine for the content-addressable file store.
//!
//! Wraps the `sha1` crate: streaming digests of files and readers, one-shot
//! digests of buffers, and an incremental [`DigestWriter`]. No custom
//! cryptography.

pub mod hasher;

pub use hasher::{
    digest_length, digest_of_bytes, digest_of_file, digest_of_reader, DigestWriter, HashError,
    CHUNK_SIZE,
};
