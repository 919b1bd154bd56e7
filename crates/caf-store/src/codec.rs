//! Canonical byte encoding of trees and commits.
//!
//! The encoding is also the hashed form: an object's digest is the SHA-1 of
//! exactly these bytes, so the layout below is a durable format contract.
//! Integers are big-endian; lengths are `u64`.
//!
//! ```text
//! tree   := "CAFT" version:u8 count:u64 record*
//! record := kind:u8 digest:[u8; 20] name_len:u64 name:utf8
//! commit := "CAFC" version:u8 tree:[u8; 20]
//!           parent_count:u64 parent:[u8; 20]*
//!           author_len:u64 author:utf8
//!           message_len:u64 message:utf8
//!           timestamp:i64
//! ```
//!
//! Record and parent order is preserved as given.

use caf_crypto::digest_of_bytes;
use caf_types::{Digest, DIGEST_SIZE};

use crate::object::{Blob, Commit, Tree, TreeRecord, TreeRecordKind};

/// Leading tag of an encoded tree.
pub const TREE_MAGIC: &[u8; 4] = b"CAFT";
/// Leading tag of an encoded commit.
pub const COMMIT_MAGIC: &[u8; 4] = b"CAFC";
/// Current format version for both object kinds.
pub const FORMAT_VERSION: u8 = 1;

/// Why an encoded object could not be decoded.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("expected {expected} object, found tag {found:?}")]
    WrongKind {
        expected: &'static str,
        found: Vec<u8>,
    },

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown tree record kind {0}")]
    UnknownRecordKind(u8),

    #[error("truncated: needed {needed} bytes at offset {offset}, {available} left")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error("{0} trailing bytes after object")]
    TrailingBytes(usize),
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

pub fn encode_tree(tree: &Tree) -> Vec<u8> {
    let mut out = Vec::with_capacity(13 + tree.len() * (1 + DIGEST_SIZE + 8 + 16));
    out.extend_from_slice(TREE_MAGIC);
    out.push(FORMAT_VERSION);
    put_u64(&mut out, tree.len() as u64);
    for record in tree.records() {
        out.push(record.kind.tag());
        out.extend_from_slice(record.digest.as_bytes());
        put_str(&mut out, &record.name);
    }
    out
}

pub fn encode_commit(commit: &Commit) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(COMMIT_MAGIC);
    out.push(FORMAT_VERSION);
    out.extend_from_slice(commit.tree.as_bytes());
    put_u64(&mut out, commit.parents.len() as u64);
    for parent in &commit.parents {
        out.extend_from_slice(parent.as_bytes());
    }
    put_str(&mut out, &commit.author);
    put_str(&mut out, &commit.message);
    out.extend_from_slice(&commit.timestamp.to_be_bytes());
    out
}

fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_str(out: &mut Vec<u8>, value: &str) {
    put_u64(out, value.len() as u64);
    out.extend_from_slice(value.as_bytes());
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

pub fn decode_tree(data: &[u8]) -> Result<Tree, CodecError> {
    let mut reader = Reader::new(data);
    reader.header(TREE_MAGIC, "tree")?;
    let count = reader.u64()?;

    // Cap preallocation by what the remaining input could hold.
    let min_record = 1 + DIGEST_SIZE + 8;
    let mut records = Vec::with_capacity(capacity_hint(count, reader.remaining(), min_record));
    for _ in 0..count {
        let tag = reader.u8()?;
        let kind = TreeRecordKind::from_tag(tag).ok_or(CodecError::UnknownRecordKind(tag))?;
        let digest = reader.digest()?;
        let name = reader.string("record name")?;
        records.push(TreeRecord::new(kind, digest, name));
    }
    reader.finish()?;
    Ok(Tree::new(records))
}

pub fn decode_commit(data: &[u8]) -> Result<Commit, CodecError> {
    let mut reader = Reader::new(data);
    reader.header(COMMIT_MAGIC, "commit")?;
    let tree = reader.digest()?;
    let parent_count = reader.u64()?;
    let mut parents =
        Vec::with_capacity(capacity_hint(parent_count, reader.remaining(), DIGEST_SIZE));
    for _ in 0..parent_count {
        parents.push(reader.digest()?);
    }
    let author = reader.string("author")?;
    let message = reader.string("message")?;
    let timestamp = i64::from_be_bytes(reader.array::<8>()?);
    reader.finish()?;
    Ok(Commit::new(tree, parents, author, message, timestamp))
}

fn capacity_hint(count: u64, remaining: usize, min_item: usize) -> usize {
    usize::try_from(count)
        .unwrap_or(usize::MAX)
        .min(remaining / min_item)
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], CodecError> {
        if needed > self.remaining() {
            return Err(CodecError::Truncated {
                offset: self.offset,
                needed,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn header(&mut self, magic: &[u8; 4], kind: &'static str) -> Result<(), CodecError> {
        let found = &self.data[..self.data.len().min(magic.len())];
        if found != magic {
            return Err(CodecError::WrongKind {
                expected: kind,
                found: found.to_vec(),
            });
        }
        self.offset = magic.len();
        let version = self.u8()?;
        if version != FORMAT_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_be_bytes(self.array::<8>()?))
    }

    fn digest(&mut self) -> Result<Digest, CodecError> {
        Ok(Digest::from_raw(self.array::<DIGEST_SIZE>()?))
    }

    fn string(&mut self, field: &'static str) -> Result<String, CodecError> {
        let len = self.u64()?;
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8(field))
    }

    fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Objects with a content-derived identity.
///
/// A tree's digest depends on its records' digests and a commit's on its
/// tree's and parents' digests, which makes the object graph a Merkle DAG.
pub trait HashObject {
    fn hash_object(&self) -> Digest;
}

impl HashObject for Blob {
    fn hash_object(&self) -> Digest {
        *self.digest()
    }
}

impl HashObject for Tree {
    fn hash_object(&self) -> Digest {
        digest_of_bytes(&encode_tree(self))
    }
}

impl HashObject for Commit {
    fn hash_object(&self) -> Digest {
        digest_of_bytes(&encode_commit(self))
    }
}

/// Digest of any blob, tree or commit.
pub fn hash_object<T: HashObject + ?Sized>(object: &T) -> Digest {
    object.hash_object()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(seed: &str) -> Digest {
        digest_of_bytes(seed.as_bytes())
    }

    fn sample_tree() -> Tree {
        Tree::new(vec![
            TreeRecord::blob(d("readme"), "README.md"),
            TreeRecord::tree(d("src"), "src"),
            TreeRecord::commit(d("vendor"), "vendor"),
        ])
    }

    fn sample_commit() -> Commit {
        Commit::new(
            d("tree"),
            vec![d("p1"), d("p2")],
            "Ada Lovelace <ada@example.com>",
            "Merge branch 'engine'\n\nwith a body",
            1_700_000_000,
        )
    }

    #[test]
    fn tree_layout_is_fixed() {
        let tree = Tree::new(vec![TreeRecord::blob(Digest::from_raw([0xab; 20]), "f")]);
        let bytes = encode_tree(&tree);

        let mut expected = b"CAFT\x01".to_vec();
        expected.extend_from_slice(&1u64.to_be_bytes());
        expected.push(2);
        expected.extend_from_slice(&[0xab; 20]);
        expected.extend_from_slice(&1u64.to_be_bytes());
        expected.push(b'f');
        assert_eq!(bytes, expected);
    }

    #[test]
    fn empty_tree_hash_is_stable() {
        // sha1("CAFT\x01" ++ 0u64)
        let empty = Tree::empty();
        assert_eq!(encode_tree(&empty), b"CAFT\x01\0\0\0\0\0\0\0\0");
        assert_eq!(
            hash_object(&empty),
            digest_of_bytes(b"CAFT\x01\0\0\0\0\0\0\0\0")
        );
    }

    #[test]
    fn tree_roundtrip_preserves_order() {
        let tree = sample_tree();
        assert_eq!(decode_tree(&encode_tree(&tree)).unwrap(), tree);
    }

    #[test]
    fn commit_roundtrip() {
        let commit = sample_commit();
        assert_eq!(decode_commit(&encode_commit(&commit)).unwrap(), commit);

        let root = Commit::new(d("tree"), vec![], "", "", -5);
        assert_eq!(decode_commit(&encode_commit(&root)).unwrap(), root);
    }

    #[test]
    fn tree_hash_is_order_sensitive() {
        let a = TreeRecord::blob(d("a"), "a");
        let b = TreeRecord::blob(d("b"), "b");
        let ab = Tree::new(vec![a.clone(), b.clone()]);
        let ba = Tree::new(vec![b, a]);
        assert_ne!(hash_object(&ab), hash_object(&ba));
        assert_eq!(hash_object(&ab), hash_object(&ab.clone()));
    }

    #[test]
    fn hash_matches_streamed_encoding() {
        use std::io::Write;

        let tree = Tree::new(vec![
            TreeRecord::blob(d("readme"), "README.md"),
            TreeRecord::tree(d("src"), "src"),
        ]);
        let commit = Commit::new(hash_object(&tree), vec![d("parent")], "bob", "msg", 7);

        let mut writer = caf_crypto::DigestWriter::new();
        writer.write_all(&encode_tree(&tree)).unwrap();
        assert_eq!(writer.finish().unwrap(), hash_object(&tree));

        // Streaming the commit in pieces gives the same digest.
        let bytes = encode_commit(&commit);
        let mut writer = caf_crypto::DigestWriter::new();
        for piece in bytes.chunks(5) {
            writer.write_all(piece).unwrap();
        }
        assert_eq!(writer.written(), bytes.len() as u64);
        assert_eq!(writer.finish().unwrap(), hash_object(&commit));
    }

    #[test]
    fn hash_depends_on_children() {
        let tree = sample_tree();
        let mut changed = sample_tree();
        changed.push(TreeRecord::blob(d("new"), "new"));
        assert_ne!(hash_object(&tree), hash_object(&changed));

        let mut commit = sample_commit();
        let original = hash_object(&commit);
        commit.tree = hash_object(&changed);
        assert_ne!(hash_object(&commit), original);
    }

    #[test]
    fn blob_hash_is_its_digest() {
        let blob = Blob::new(d("content"));
        assert_eq!(hash_object(&blob), d("content"));
    }

    #[test]
    fn tree_and_commit_are_not_interchangeable() {
        let tree_bytes = encode_tree(&sample_tree());
        assert!(matches!(
            decode_commit(&tree_bytes),
            Err(CodecError::WrongKind { expected: "commit", .. })
        ));
        let commit_bytes = encode_commit(&sample_commit());
        assert!(matches!(
            decode_tree(&commit_bytes),
            Err(CodecError::WrongKind { expected: "tree", .. })
        ));
        assert!(matches!(decode_tree(b""), Err(CodecError::WrongKind { .. })));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = encode_tree(&sample_tree());
        bytes[4] = 9;
        assert_eq!(decode_tree(&bytes), Err(CodecError::UnsupportedVersion(9)));
    }

    #[test]
    fn rejects_unknown_record_kind() {
        let mut bytes = encode_tree(&sample_tree());
        bytes[13] = 7;
        assert_eq!(decode_tree(&bytes), Err(CodecError::UnknownRecordKind(7)));
    }

    #[test]
    fn rejects_every_truncation() {
        let bytes = encode_commit(&sample_commit());
        for len in 0..bytes.len() {
            assert!(decode_commit(&bytes[..len]).is_err(), "prefix of {len} bytes");
        }
        let bytes = encode_tree(&sample_tree());
        for len in 0..bytes.len() {
            assert!(decode_tree(&bytes[..len]).is_err(), "prefix of {len} bytes");
        }
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = encode_tree(&sample_tree());
        bytes.push(0);
        assert_eq!(decode_tree(&bytes), Err(CodecError::TrailingBytes(1)));
    }

    #[test]
    fn rejects_invalid_utf8_name() {
        let tree = Tree::new(vec![TreeRecord::blob(d("x"), "ab")]);
        let mut bytes = encode_tree(&tree);
        let last = bytes.len() - 1;
        bytes[last] = 0xff;
        assert_eq!(
            decode_tree(&bytes),
            Err(CodecError::InvalidUtf8("record name"))
        );
    }

    #[test]
    fn huge_count_on_short_input_is_truncation() {
        let mut bytes = b"CAFT\x01".to_vec();
        bytes.extend_from_slice(&u64::MAX.to_be_bytes());
        assert!(matches!(
            decode_tree(&bytes),
            Err(CodecError::Truncated { .. })
        ));
    }

    fn arb_record() -> impl Strategy<Value = TreeRecord> {
        (
            prop_oneof![
                Just(TreeRecordKind::Tree),
                Just(TreeRecordKind::Blob),
                Just(TreeRecordKind::Commit)
            ],
            any::<[u8; 20]>(),
            ".{0,24}",
        )
            .prop_map(|(kind, raw, name)| TreeRecord::new(kind, Digest::from_raw(raw), name))
    }

    proptest! {
        #[test]
        fn any_tree_survives_encoding(records in prop::collection::vec(arb_record(), 0..16)) {
            let tree = Tree::new(records);
            let bytes = encode_tree(&tree);
            prop_assert_eq!(decode_tree(&bytes).unwrap(), tree.clone());
            prop_assert_eq!(hash_object(&tree), digest_of_bytes(&bytes));
        }
    }
}
