//! Retrieval cache.
//!
//! Maps a block-data identifier to a [`BlockDataRequest`]. A request is
//! either pending (a background fetch is in flight) or ready, in which case it
//! carries the decoded batch. Readiness and the data are published through a
//! single `watch` value, so a reader that observes "ready" always observes the
//! data with it.

use ballot_types::Transaction;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// A decoded transaction batch together with its canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockData {
    /// Transactions in proposal order.
    pub transactions: Vec<Transaction>,
    /// Canonical encoding the identifier was computed over.
    pub encoded: Bytes,
}

/// Retrieval record for one identifier.
#[derive(Debug)]
pub struct BlockDataRequest {
    data_id: String,
    ready: watch::Sender<Option<Arc<BlockData>>>,
}

impl BlockDataRequest {
    fn pending(data_id: String) -> Self {
        let (ready, _) = watch::channel(None);
        Self { data_id, ready }
    }

    fn available(data_id: String, data: BlockData) -> Self {
        let (ready, _) = watch::channel(Some(Arc::new(data)));
        Self { data_id, ready }
    }

    /// Identifier this record belongs to.
    pub fn data_id(&self) -> &str {
        &self.data_id
    }

    /// Whether the batch has been retrieved.
    pub fn is_ready(&self) -> bool {
        self.ready.borrow().is_some()
    }

    /// The batch, if ready.
    pub fn data(&self) -> Option<Arc<BlockData>> {
        self.ready.borrow().clone()
    }

    /// Waits until the batch is ready.
    pub async fn wait_ready(&self) -> Option<Arc<BlockData>> {
        let mut rx = self.ready.subscribe();
        let data = match rx.wait_for(Option::is_some).await {
            Ok(data) => data.clone(),
            Err(_) => None,
        };
        data
    }

    fn complete(&self, data: BlockData) {
        self.ready.send_replace(Some(Arc::new(data)));
    }
}

/// Concurrent map of retrieval records, shared between the strategy and the
/// retriever.
#[derive(Debug, Default)]
pub struct RequestCache {
    requests: RwLock<HashMap<String, Arc<BlockDataRequest>>>,
}

impl RequestCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a record.
    pub fn get(&self, data_id: &str) -> Option<Arc<BlockDataRequest>> {
        self.requests.read().get(data_id).cloned()
    }

    /// Records a batch that is already known locally (we proposed it).
    ///
    /// A pending record for the same identifier is completed in place, so
    /// anyone waiting on it is woken.
    pub fn set_immediately_available(
        &self,
        data_id: &str,
        transactions: Vec<Transaction>,
        encoded: Bytes,
    ) -> Arc<BlockDataRequest> {
        let data = BlockData {
            transactions,
            encoded,
        };
        let mut requests = self.requests.write();
        if let Some(existing) = requests.get(data_id).cloned() {
            existing.complete(data);
            return existing;
        }
        let request = Arc::new(BlockDataRequest::available(data_id.to_string(), data));
        requests.insert(data_id.to_string(), request.clone());
        request
    }

    /// Inserts a pending record.
    ///
    /// Returns `None` if a record (pending or ready) already exists.
    pub fn insert_pending(&self, data_id: &str) -> Option<Arc<BlockDataRequest>> {
        let mut requests = self.requests.write();
        if requests.contains_key(data_id) {
            return None;
        }
        let request = Arc::new(BlockDataRequest::pending(data_id.to_string()));
        requests.insert(data_id.to_string(), request.clone());
        Some(request)
    }

    /// Completes a pending record. Returns false if no record exists.
    pub fn mark_ready(&self, data_id: &str, data: BlockData) -> bool {
        match self.get(data_id) {
            Some(request) => {
                request.complete(data);
                true
            }
            None => false,
        }
    }

    /// Removes a pending record. Ready records are left alone.
    pub fn remove_pending(&self, data_id: &str) -> bool {
        let mut requests = self.requests.write();
        let pending = requests.get(data_id).is_some_and(|r| !r.is_ready());
        if pending {
            requests.remove(data_id);
        }
        pending
    }

    /// Drops every record whose height is below `height`.
    ///
    /// Identifiers are keyed by their textual form, which always starts with
    /// the decimal height.
    pub fn prune_below(&self, height: u64) -> usize {
        let mut requests = self.requests.write();
        let before = requests.len();
        requests.retain(|id, _| {
            id.split(':')
                .next()
                .and_then(|h| h.parse::<u64>().ok())
                .map_or(true, |h| h >= height)
        });
        before - requests.len()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.requests.read().len()
    }

    /// Returns true if the cache holds no records.
    pub fn is_empty(&self) -> bool {
        self.requests.read().is_empty()
    }
}
