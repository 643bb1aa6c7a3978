//! Block data dissemination.

use async_trait::async_trait;
use ballot_types::Transaction;
use bytes::Bytes;
use thiserror::Error;

/// What a provider hands back after making a batch available to peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedBlockData {
    /// Identifier to put in the proposed header.
    pub data_id: String,
    /// Location hints peers can fetch the batch from.
    pub addrs: Vec<String>,
    /// Canonical encoding of the batch.
    pub encoded: Bytes,
}

/// Errors returned by a [`BlockDataProvider`].
#[derive(Debug, Error)]
pub enum ProvideError {
    /// Providers are only asked for non-empty batches.
    #[error("cannot provide an empty batch")]
    EmptyBatch,

    /// The encoded batch exceeds the configured maximum.
    #[error("encoded batch too large: {size} bytes (max {max})")]
    TooLarge {
        /// Encoded size
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// The backing transport failed.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Makes a batch of transactions fetchable by other validators.
#[async_trait]
pub trait BlockDataProvider: Send + Sync {
    /// Encodes and publishes `txs`, proposed at (`height`, `round`).
    async fn provide(
        &self,
        height: u64,
        round: u32,
        txs: &[Transaction],
    ) -> Result<ProvidedBlockData, ProvideError>;
}
