//! In-process block data store.
//!
//! Serves as both ends of dissemination: validators that share one store can
//! provide batches and fetch each other's batches without a network. Location
//! hints have the form `<prefix>/<data_id>`.

use async_trait::async_trait;
use ballot_config::BlockDataConfig;
use ballot_types::Transaction;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::data_id::DataId;
use crate::provider::{BlockDataProvider, ProvideError, ProvidedBlockData};
use crate::retriever::{BlockDataFetcher, FetchError};

/// Encoded batches keyed by identifier.
#[derive(Debug)]
pub struct MemoryBlockDataStore {
    prefix: String,
    max_data_bytes: usize,
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBlockDataStore {
    /// Creates an empty store.
    pub fn new(config: &BlockDataConfig) -> Self {
        Self {
            prefix: config.location_prefix.trim_end_matches('/').to_string(),
            max_data_bytes: config.max_data_bytes,
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Location hint for `data_id`.
    pub fn location_for(&self, data_id: &str) -> String {
        format!("{}/{}", self.prefix, data_id)
    }

    /// Stores raw bytes under `data_id`, replacing any previous entry.
    pub fn insert(&self, data_id: &str, encoded: Bytes) {
        self.blobs.write().insert(data_id.to_string(), encoded);
    }

    /// Removes an entry.
    pub fn remove(&self, data_id: &str) -> Option<Bytes> {
        self.blobs.write().remove(data_id)
    }

    /// Whether an entry exists for `data_id`.
    pub fn contains(&self, data_id: &str) -> bool {
        self.blobs.read().contains_key(data_id)
    }

    /// Number of stored batches.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl Default for MemoryBlockDataStore {
    fn default() -> Self {
        Self::new(&BlockDataConfig::default())
    }
}

#[async_trait]
impl BlockDataProvider for MemoryBlockDataStore {
    async fn provide(
        &self,
        height: u64,
        round: u32,
        txs: &[Transaction],
    ) -> Result<ProvidedBlockData, ProvideError> {
        if txs.is_empty() {
            return Err(ProvideError::EmptyBatch);
        }

        let (id, encoded) = DataId::for_transactions(height, round, txs);
        if encoded.len() > self.max_data_bytes {
            return Err(ProvideError::TooLarge {
                size: encoded.len(),
                max: self.max_data_bytes,
            });
        }

        let data_id = id.to_string();
        self.insert(&data_id, encoded.clone());
        debug!(height, round, data_id = %data_id, bytes = encoded.len(), "Stored block data");

        Ok(ProvidedBlockData {
            addrs: vec![self.location_for(&data_id)],
            data_id,
            encoded,
        })
    }
}

#[async_trait]
impl BlockDataFetcher for MemoryBlockDataStore {
    async fn fetch(&self, location: &str, _id: &DataId) -> Result<Bytes, FetchError> {
        let key = location
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| FetchError::UnsupportedLocation(location.to_string()))?;

        self.blobs
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(location.to_string()))
    }
}
