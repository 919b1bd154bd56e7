use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Raw SHA-1 output width in bytes.
pub const DIGEST_SIZE: usize = 20;

/// Width of the textual (lowercase hex) form of a digest.
pub const DIGEST_HEX_LEN: usize = DIGEST_SIZE * 2;

/// Content-addressed identifier for any stored object.
///
/// A `Digest` is the SHA-1 hash of an object's content (or, for trees and
/// commits, of their canonical encoding). Equal digests are treated as equal
/// content. The textual form is always 40 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest([u8; DIGEST_SIZE]);

impl Digest {
    /// Wrap a pre-computed raw hash.
    pub const fn from_raw(raw: [u8; DIGEST_SIZE]) -> Self {
        Self(raw)
    }

    /// The raw 20-byte hash.
    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    /// Lowercase hex string, zero-padded per byte.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated form for log lines (first 7 characters).
    pub fn short_hex(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(7);
        hex
    }

    /// Parse a 40-character hex string. Upper case is accepted and normalized.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.len() != DIGEST_HEX_LEN {
            return Err(TypeError::InvalidLength {
                expected: DIGEST_HEX_LEN,
                actual: s.len(),
            });
        }
        let mut raw = [0u8; DIGEST_SIZE];
        hex::decode_to_slice(s, &mut raw).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Ok(Self(raw))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; DIGEST_SIZE]> for Digest {
    fn from(raw: [u8; DIGEST_SIZE]) -> Self {
        Self(raw)
    }
}

impl From<Digest> for [u8; DIGEST_SIZE] {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}
