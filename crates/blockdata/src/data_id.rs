//! Block-data identifiers.
//!
//! A proposal header never carries its transactions. Instead it carries a
//! compact, content-addressed identifier of the form
//!
//! ```text
//! <height>:<round>:<n_txs>:<data_len>:<hex_hash>
//! ```
//!
//! where `data_len` is the length of the canonical encoding of the batch and
//! `hex_hash` is the Keccak256 hash of that encoding. The empty batch always
//! uses [`ZERO_HASH`], the hash of no input at all, so every node derives the
//! same "no transactions" identifier for a given height and round.

use ballot_types::{Transaction, H256};
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::encoding::encode_transactions;

/// Keccak256 of the empty input, as lowercase hex.
pub const ZERO_HASH: &str = "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470";

/// Suffix of every empty-batch identifier: `n_txs = 0`, `data_len = 0` and [`ZERO_HASH`].
pub const ZERO_HASH_SUFFIX: &str =
    ":0:0:c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470";

/// [`ZERO_HASH`] as raw bytes.
pub const ZERO_HASH_BYTES: H256 = H256::new([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

/// Errors returned when parsing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataIdError {
    /// The identifier is not valid UTF-8.
    #[error("data id is not valid UTF-8")]
    NotUtf8,

    /// Wrong number of colon-separated fields.
    #[error("data id must have 5 fields, got {0}")]
    FieldCount(usize),

    /// A numeric field could not be parsed.
    #[error("invalid {field} in data id: {value:?}")]
    InvalidNumber {
        /// Name of the field.
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// The hash field is not 64 lowercase hex characters.
    #[error("invalid hash in data id: {0:?}")]
    InvalidHash(String),

    /// An empty batch with a non-zero length or a non-canonical hash.
    #[error("empty batch must have data_len 0 and the zero hash")]
    NonCanonicalEmpty,

    /// A non-empty batch that claims zero encoded bytes.
    #[error("batch of {0} transactions cannot have data_len 0")]
    MissingLength(usize),
}

/// Parsed form of a block-data identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataId {
    /// Height the batch was proposed at.
    pub height: u64,
    /// Round the batch was proposed in.
    pub round: u32,
    /// Number of transactions in the batch.
    pub n_txs: usize,
    /// Length of the canonical encoding.
    pub data_len: usize,
    /// Keccak256 of the canonical encoding.
    pub hash: H256,
}

impl DataId {
    /// Builds an identifier from its parts.
    pub const fn new(height: u64, round: u32, n_txs: usize, data_len: usize, hash: H256) -> Self {
        Self {
            height,
            round,
            n_txs,
            data_len,
            hash,
        }
    }

    /// The canonical identifier for a batch with no transactions.
    pub const fn empty(height: u64, round: u32) -> Self {
        Self::new(height, round, 0, 0, ZERO_HASH_BYTES)
    }

    /// Identifier for an already-encoded batch of `n_txs` transactions.
    ///
    /// No hashing happens for `n_txs == 0`; the result is [`DataId::empty`].
    pub fn from_encoded(height: u64, round: u32, n_txs: usize, encoded: &[u8]) -> Self {
        if n_txs == 0 {
            return Self::empty(height, round);
        }
        Self::new(height, round, n_txs, encoded.len(), H256::keccak256(encoded))
    }

    /// Encodes `txs` canonically and returns the identifier with the encoding.
    pub fn for_transactions(height: u64, round: u32, txs: &[Transaction]) -> (Self, Bytes) {
        if txs.is_empty() {
            return (Self::empty(height, round), Bytes::new());
        }
        let encoded = encode_transactions(txs);
        (Self::from_encoded(height, round, txs.len(), &encoded), encoded)
    }

    /// Returns true if this identifies the empty batch.
    pub fn is_empty(&self) -> bool {
        self.n_txs == 0
    }

    /// Parses an identifier received as raw header bytes.
    pub fn parse_bytes(raw: &[u8]) -> Result<Self, DataIdError> {
        std::str::from_utf8(raw)
            .map_err(|_| DataIdError::NotUtf8)?
            .parse()
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.n_txs == 0 {
            return write!(f, "{}:{}{}", self.height, self.round, ZERO_HASH_SUFFIX);
        }
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.height,
            self.round,
            self.n_txs,
            self.data_len,
            self.hash.to_plain_hex()
        )
    }
}

impl FromStr for DataId {
    type Err = DataIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(':').collect();
        if fields.len() != 5 {
            return Err(DataIdError::FieldCount(fields.len()));
        }

        let height = parse_decimal::<u64>("height", fields[0])?;
        let round = parse_decimal::<u32>("round", fields[1])?;
        let n_txs = parse_decimal::<usize>("n_txs", fields[2])?;
        let data_len = parse_decimal::<usize>("data_len", fields[3])?;
        let hash = parse_hash(fields[4])?;

        if n_txs == 0 {
            if data_len != 0 || hash != ZERO_HASH_BYTES {
                return Err(DataIdError::NonCanonicalEmpty);
            }
        } else if data_len == 0 {
            return Err(DataIdError::MissingLength(n_txs));
        }

        Ok(Self::new(height, round, n_txs, data_len, hash))
    }
}

/// Formats an identifier from its parts.
pub fn data_id(height: u64, round: u32, n_txs: usize, data_len: usize, hash: H256) -> String {
    DataId::new(height, round, n_txs, data_len, hash).to_string()
}

/// Parses a textual identifier.
pub fn parse_data_id(s: &str) -> Result<DataId, DataIdError> {
    s.parse()
}

// Only canonical decimal: no sign, no leading zeros, so that parse and
// display are exact inverses.
fn parse_decimal<T: FromStr>(field: &'static str, value: &str) -> Result<T, DataIdError> {
    let invalid = || DataIdError::InvalidNumber {
        field,
        value: value.to_string(),
    };

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if value.len() > 1 && value.starts_with('0') {
        return Err(invalid());
    }
    value.parse().map_err(|_| invalid())
}

fn parse_hash(value: &str) -> Result<H256, DataIdError> {
    let lowercase_hex = value
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if value.len() != 64 || !lowercase_hex {
        return Err(DataIdError::InvalidHash(value.to_string()));
    }
    H256::from_hex(value).map_err(|_| DataIdError::InvalidHash(value.to_string()))
}
