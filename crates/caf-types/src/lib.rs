//! Foundation types for the content-addressable file store (CAF).
//!
//! Every other CAF crate depends on `caf-types` for [`Digest`], the
//! fixed-width SHA-1 identifier shared by blobs, trees and commits.

pub mod digest;
pub mod error;

pub use digest::{Digest, DIGEST_HEX_LEN, DIGEST_SIZE};
pub use error::TypeError;
