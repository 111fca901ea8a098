//! Digest strings and leaf hashers
//!
//! Every digest in a tree, whether leaf, internal or root, is the uppercase
//! hexadecimal rendering of a 256-bit hash: exactly 64 characters.
//! Internal nodes always use [`Digest::combine`]; only the leaf level is
//! pluggable, through the [`LeafHasher`] trait.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// Length of a rendered digest in hex characters
pub const DIGEST_HEX_LEN: usize = 64;

/// An uppercase-hex 256-bit digest
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Render raw digest bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Digest(hex::encode_upper(bytes))
    }

    /// SHA-256 of arbitrary data
    pub fn sha256(data: impl AsRef<[u8]>) -> Self {
        Digest::from_bytes(Sha256::digest(data.as_ref()).into())
    }

    /// BLAKE3 (256-bit output) of arbitrary data
    pub fn blake3(data: impl AsRef<[u8]>) -> Self {
        Digest::from_bytes(*blake3::hash(data.as_ref()).as_bytes())
    }

    /// Digest of an internal node: SHA-256 over the concatenation of the two
    /// child digest strings, with no separator.
    pub fn combine(left: &Digest, right: &Digest) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(left.0.as_bytes());
        hasher.update(right.0.as_bytes());
        Digest::from_bytes(hasher.finalize().into())
    }

    /// Parse a hex string, accepting either case
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.len() != DIGEST_HEX_LEN {
            return Err(Error::InvalidDigest(format!(
                "expected {} hex characters, got {}",
                DIGEST_HEX_LEN,
                s.len()
            )));
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidDigest(format!("not hexadecimal: {s}")));
        }
        Ok(Digest(s.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get a short prefix for display (first 7 chars, like git)
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short())
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Digest {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Digest::from_hex(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

/// Computes the digest of a single leaf item
///
/// Implementations must be deterministic. Returning an error is allowed and
/// aborts whatever tree operation asked for the digest. Any
/// `Fn(&T) -> Result<Digest>` closure is a `LeafHasher<T>`.
pub trait LeafHasher<T>: Send + Sync {
    /// Digest one item
    fn digest(&self, item: &T) -> Result<Digest>;
}

impl<T, F> LeafHasher<T> for F
where
    F: Fn(&T) -> Result<Digest> + Send + Sync,
{
    fn digest(&self, item: &T) -> Result<Digest> {
        self(item)
    }
}

/// SHA-256 over the item's bytes
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Leaf;

impl<T: AsRef<[u8]>> LeafHasher<T> for Sha256Leaf {
    fn digest(&self, item: &T) -> Result<Digest> {
        Ok(Digest::sha256(item))
    }
}

/// BLAKE3 over the item's bytes
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Leaf;

impl<T: AsRef<[u8]>> LeafHasher<T> for Blake3Leaf {
    fn digest(&self, item: &T) -> Result<Digest> {
        Ok(Digest::blake3(item))
    }
}

/// SHA-256 over the item's bincode encoding, for structured payloads
#[derive(Clone, Copy, Debug, Default)]
pub struct SerializedLeaf;

impl<T: Serialize> LeafHasher<T> for SerializedLeaf {
    fn digest(&self, item: &T) -> Result<Digest> {
        let data = bincode::serialize(item)?;
        Ok(Digest::sha256(data))
    }
}
