use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use caf_types::{Digest, DIGEST_HEX_LEN, DIGEST_SIZE};
use sha1::{Digest as _, Sha1};
use tracing::trace;

/// Read buffer size used when streaming content through the hasher.
pub const CHUNK_SIZE: usize = 4096;

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// The input could not be opened or read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The digest backend produced unusable output.
    #[error("digest failure: {0}")]
    Crypto(String),
}

/// Hash an in-memory buffer in one shot.
pub fn digest_of_bytes(data: &[u8]) -> Digest {
    let mut raw = [0u8; DIGEST_SIZE];
    raw.copy_from_slice(&Sha1::digest(data));
    Digest::from_raw(raw)
}

/// Hash everything readable from `reader`, [`CHUNK_SIZE`] bytes at a time.
pub fn digest_of_reader<R: Read>(mut reader: R) -> Result<Digest, HashError> {
    let mut hasher = Sha1::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buf[..n]);
    }
    finalize(hasher)
}

/// Hash a file without loading it into memory.
pub fn digest_of_file(path: impl AsRef<Path>) -> Result<Digest, HashError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let digest = digest_of_reader(file)?;
    trace!(path = %path.display(), digest = %digest, "hashed file");
    Ok(digest)
}

/// Length of a digest's hex form.
pub fn digest_length() -> usize {
    DIGEST_HEX_LEN
}

fn finalize(hasher: Sha1) -> Result<Digest, HashError> {
    let out = hasher.finalize();
    let raw: [u8; DIGEST_SIZE] = out
        .as_slice()
        .try_into()
        .map_err(|_| HashError::Crypto(format!("unexpected digest width {}", out.len())))?;
    Ok(Digest::from_raw(raw))
}

/// An [`io::Write`] sink that hashes everything written to it.
///
/// Useful when content is produced incrementally and its digest is needed
/// before (or instead of) storing it.
#[derive(Default)]
pub struct DigestWriter {
    hasher: Sha1,
    written: u64,
}

impl DigestWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes fed so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Consume the writer and produce the digest.
    pub fn finish(self) -> Result<Digest, HashError> {
        finalize(self.hasher)
    }
}

impl Write for DigestWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.hasher.update(buf);
        self.written += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA1: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

    #[test]
    fn empty_input_has_known_digest() {
        assert_eq!(digest_of_bytes(b"").to_hex(), EMPTY_SHA1);
    }

    #[test]
    fn known_vector() {
        // `printf 'Hello, World!' | sha1sum`
        assert_eq!(
            digest_of_bytes(b"Hello, World!").to_hex(),
            "0a0a9f2a6772942557ab5355d76af442f8f65e01"
        );
    }

    #[test]
    fn bytes_hash_is_deterministic() {
        let a = digest_of_bytes(b"hello world");
        let b = digest_of_bytes(b"hello world");
        assert_eq!(a, b);
        assert_ne!(a, digest_of_bytes(b"hello world!"));
    }

    #[test]
    fn digest_length_is_forty() {
        assert_eq!(digest_length(), 40);
        assert_eq!(digest_of_bytes(b"x").to_hex().len(), digest_length());
    }

    #[test]
    fn file_hash_matches_bytes_hash_across_chunk_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        for len in [0, 1, CHUNK_SIZE - 1, CHUNK_SIZE, CHUNK_SIZE + 1, 3 * CHUNK_SIZE + 17] {
            let content: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let path = dir.path().join(format!("f{len}"));
            std::fs::write(&path, &content).unwrap();
            assert_eq!(
                digest_of_file(&path).unwrap(),
                digest_of_bytes(&content),
                "length {len}"
            );
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = digest_of_file(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, HashError::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }

    #[test]
    fn digest_writer_matches_one_shot() {
        let mut writer = DigestWriter::new();
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();
        assert_eq!(writer.written(), 11);
        assert_eq!(writer.finish().unwrap(), digest_of_bytes(b"hello world"));
    }
}
