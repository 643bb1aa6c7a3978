//! Canonical encoding of a transaction batch.
//!
//! A batch is encoded as an RLP list of transaction payloads. The
//! [`DataId`](crate::DataId) hash and length are taken over these bytes, so
//! every node that holds the same transactions in the same order produces the
//! same identifier.

use ballot_types::{Transaction, H256};
use bytes::Bytes;
use rlp::{DecoderError, Rlp};
use thiserror::Error;

use crate::data_id::DataId;
use crate::request_cache::BlockData;

/// A fetched payload that does not match the identifier it was fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockDataError {
    /// Encoded length differs from `data_len`.
    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Length claimed by the identifier.
        expected: usize,
        /// Length of the payload.
        actual: usize,
    },

    /// Content hash differs from the identifier hash.
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Hash claimed by the identifier.
        expected: H256,
        /// Hash of the payload.
        actual: H256,
    },

    /// Decoded transaction count differs from `n_txs`.
    #[error("transaction count mismatch: expected {expected}, got {actual}")]
    CountMismatch {
        /// Count claimed by the identifier.
        expected: usize,
        /// Count decoded from the payload.
        actual: usize,
    },

    /// The payload is not a canonical batch encoding.
    #[error("decode error: {0}")]
    Decode(#[from] DecoderError),
}

/// Encodes a batch.
pub fn encode_transactions(txs: &[Transaction]) -> Bytes {
    rlp::encode_list::<Transaction, _>(txs).freeze()
}

/// Decodes a batch produced by [`encode_transactions`].
///
/// Trailing bytes after the list are rejected.
pub fn decode_transactions(encoded: &[u8]) -> Result<Vec<Transaction>, DecoderError> {
    let rlp = Rlp::new(encoded);
    if !rlp.is_list() {
        return Err(DecoderError::RlpExpectedToBeList);
    }
    let (payload_len, offset) = {
        let info = rlp.payload_info()?;
        (info.value_len, info.header_len)
    };
    if offset + payload_len != encoded.len() {
        return Err(DecoderError::RlpInconsistentLengthAndData);
    }
    rlp.as_list()
}

/// Checks `encoded` against `id` and decodes it.
///
/// Length is checked before hashing and hashing before decoding, so a
/// payload of the wrong size costs nothing to reject.
pub fn verify_block_data(id: &DataId, encoded: Bytes) -> Result<BlockData, BlockDataError> {
    if encoded.len() != id.data_len {
        return Err(BlockDataError::LengthMismatch {
            expected: id.data_len,
            actual: encoded.len(),
        });
    }

    let actual = H256::keccak256(&encoded);
    if actual != id.hash {
        return Err(BlockDataError::HashMismatch {
            expected: id.hash,
            actual,
        });
    }

    let transactions = decode_transactions(&encoded)?;
    if transactions.len() != id.n_txs {
        return Err(BlockDataError::CountMismatch {
            expected: id.n_txs,
            actual: transactions.len(),
        });
    }

    Ok(BlockData {
        transactions,
        encoded,
    })
}
