//! Keccak256 digests.
//!
//! Block hashes handed over by the consensus engine, transaction hashes and
//! the content hash of a block-data batch are all [`H256`] values.

use crate::{Error, Result};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Size of a hash in bytes
pub const HASH_SIZE: usize = 32;

/// A 32-byte digest.
///
/// Ordering is bytewise, which is what vote tie-breaking relies on.
///
/// ```rust
/// use ballot_types::H256;
///
/// let hash = H256::keccak256(b"hello world");
/// let hex = "0x47173285a8d7341e5e972fc677286384f802f8ef42a5ec5f03bbfa254cb01fad";
/// let parsed: H256 = hex.parse().unwrap();
/// assert_eq!(hash, parsed);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct H256([u8; HASH_SIZE]);

impl H256 {
    /// All zeros.
    pub const NIL: Self = Self([0u8; HASH_SIZE]);

    /// Wraps raw digest bytes.
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Keccak256 of `data`.
    pub fn keccak256(data: &[u8]) -> Self {
        Self(Keccak256::digest(data).into())
    }

    /// Digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Parses 64 hex characters, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; HASH_SIZE];
        if digits.len() != HASH_SIZE * 2 {
            return Err(Error::InvalidLength {
                expected: HASH_SIZE * 2,
                actual: digits.len(),
            });
        }
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Lowercase hex without a prefix, as used inside data ids.
    pub fn to_plain_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First eight bytes as hex, for log fields.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H256({self})")
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_plain_hex())
    }
}

impl FromStr for H256 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<[u8; HASH_SIZE]> for H256 {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for H256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            H256::keccak256(b"").to_plain_hex(),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_hex_round_trip() {
        let plain = "47173285a8d7341e5e972fc677286384f802f8ef42a5ec5f03bbfa254cb01fad";
        let hash = H256::from_hex(plain).unwrap();
        assert_eq!(hash, H256::from_hex(&format!("0x{plain}")).unwrap());
        assert_eq!(hash.to_plain_hex(), plain);
        assert_eq!(hash.to_string(), format!("0x{plain}"));
        assert_eq!(hash.short(), &plain[..16]);
    }

    #[test]
    fn test_invalid_hex() {
        assert!(matches!(
            H256::from_hex("0x1234"),
            Err(Error::InvalidLength { expected: 64, actual: 4 })
        ));
        assert!(matches!(H256::from_hex(&"GG".repeat(32)), Err(Error::InvalidHex(_))));
    }

    #[test]
    fn test_ordering_is_bytewise() {
        assert!(H256::new([0x01; 32]) < H256::new([0x02; 32]));
        assert!(H256::NIL < H256::keccak256(b"x"));
    }
}
