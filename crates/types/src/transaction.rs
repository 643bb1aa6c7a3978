//! Opaque application transactions.
//!
//! The decision layer never interprets transaction contents. A [`Transaction`]
//! is a byte payload produced by the application, identified by the Keccak256
//! hash of that payload.

use crate::H256;
use bytes::Bytes;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An application transaction.
///
/// The hash is computed once at construction. Equality compares payloads.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Bytes", into = "Bytes")]
pub struct Transaction {
    payload: Bytes,
    hash: H256,
}

impl Transaction {
    /// Creates a transaction from its encoded payload.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let hash = H256::keccak256(&payload);
        Self { payload, hash }
    }

    /// Returns the transaction hash.
    #[inline]
    pub fn hash(&self) -> H256 {
        self.hash
    }

    /// Returns the raw payload.
    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Returns the payload size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Returns true if the payload starts with the given prefix.
    pub fn has_prefix(&self, prefix: &[u8]) -> bool {
        self.payload.starts_with(prefix)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("hash", &self.hash)
            .field("size", &self.payload.len())
            .finish()
    }
}

impl From<Bytes> for Transaction {
    fn from(payload: Bytes) -> Self {
        Self::new(payload)
    }
}

impl From<Transaction> for Bytes {
    fn from(tx: Transaction) -> Self {
        tx.payload
    }
}

impl Encodable for Transaction {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.encoder().encode_value(&self.payload);
    }
}

impl Decodable for Transaction {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        let payload: Vec<u8> = rlp.as_val()?;
        Ok(Self::new(payload))
    }
}
