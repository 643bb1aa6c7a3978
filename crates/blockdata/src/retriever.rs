//! Background retrieval of proposed block data.
//!
//! When a validator sees a proposed header whose batch it does not hold, it
//! asks a [`BlockDataRetriever`] to fetch it. Retrieval is fire-and-forget:
//! the caller never awaits the fetch and instead polls the shared
//! [`RequestCache`] on its next consideration pass.

use async_trait::async_trait;
use ballot_config::RetrievalConfig;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::annotation::ProposalDriverAnnotation;
use crate::data_id::{DataId, DataIdError};
use crate::encoding::verify_block_data;
use crate::request_cache::{BlockData, RequestCache};

/// Errors returned by a single fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Nothing is stored at the location.
    #[error("block data not found at {0}")]
    NotFound(String),

    /// The fetcher does not serve this kind of location.
    #[error("unsupported location: {0}")]
    UnsupportedLocation(String),

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Fetches raw encoded batches from a location hint.
#[async_trait]
pub trait BlockDataFetcher: Send + Sync {
    /// Fetches the batch identified by `id` from `location`.
    async fn fetch(&self, location: &str, id: &DataId) -> Result<Bytes, FetchError>;
}

/// Errors returned when a retrieval cannot be started.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The identifier did not parse.
    #[error("invalid data id: {0}")]
    InvalidDataId(#[from] DataIdError),

    /// Empty batches are never fetched.
    #[error("empty batch needs no retrieval")]
    EmptyBatch,

    /// The driver annotation did not decode.
    #[error("invalid driver annotation: {0}")]
    InvalidAnnotation(#[from] serde_json::Error),

    /// The driver annotation carries no location hints.
    #[error("driver annotation has no locations")]
    NoLocations,

    /// The identifier claims more data than we are willing to fetch.
    #[error("data_len {data_len} exceeds maximum {max}")]
    TooLarge {
        /// Length claimed by the identifier
        data_len: usize,
        /// Configured maximum
        max: usize,
    },

    /// The retriever has been shut down.
    #[error("retriever is shutting down")]
    ShuttingDown,
}

/// Starts background retrievals and tracks them until they finish.
#[async_trait]
pub trait BlockDataRetriever: Send + Sync {
    /// Starts fetching the batch named by `data_id` using the location hints
    /// in `driver_annotation`. Returns as soon as the fetch is scheduled.
    fn retrieve(&self, data_id: &str, driver_annotation: &[u8]) -> Result<(), RetrieveError>;

    /// Waits for every retrieval started so far to finish or be cancelled.
    async fn wait(&self);
}

/// [`BlockDataRetriever`] that fetches through a [`BlockDataFetcher`] and
/// publishes verified batches into a [`RequestCache`].
pub struct ProposedBlockDataRetriever<F: ?Sized> {
    cache: Arc<RequestCache>,
    fetcher: Arc<F>,
    config: RetrievalConfig,
    max_data_bytes: usize,
    tracker: TaskTracker,
    cancel: CancellationToken,
    /// Orders `wait`'s reopen against `shutdown`'s cancel and close.
    lifecycle: Mutex<()>,
}

impl<F> ProposedBlockDataRetriever<F>
where
    F: BlockDataFetcher + ?Sized + 'static,
{
    /// Creates a retriever publishing into `cache`.
    pub fn new(
        cache: Arc<RequestCache>,
        fetcher: Arc<F>,
        config: RetrievalConfig,
        max_data_bytes: usize,
    ) -> Self {
        Self {
            cache,
            fetcher,
            config,
            max_data_bytes,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            lifecycle: Mutex::new(()),
        }
    }

    /// Number of retrievals still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Cancels outstanding retrievals and waits for them to wind down.
    ///
    /// Further calls to [`BlockDataRetriever::retrieve`] fail with
    /// [`RetrieveError::ShuttingDown`].
    pub async fn shutdown(&self) {
        {
            let _guard = self.lifecycle.lock();
            self.cancel.cancel();
            self.tracker.close();
        }
        self.tracker.wait().await;
        info!("Block data retriever shut down");
    }
}

#[async_trait]
impl<F> BlockDataRetriever for ProposedBlockDataRetriever<F>
where
    F: BlockDataFetcher + ?Sized + 'static,
{
    fn retrieve(&self, data_id: &str, driver_annotation: &[u8]) -> Result<(), RetrieveError> {
        if self.cancel.is_cancelled() {
            return Err(RetrieveError::ShuttingDown);
        }

        let id: DataId = data_id.parse()?;
        if id.is_empty() {
            return Err(RetrieveError::EmptyBatch);
        }
        if id.data_len > self.max_data_bytes {
            return Err(RetrieveError::TooLarge {
                data_len: id.data_len,
                max: self.max_data_bytes,
            });
        }

        let annotation = ProposalDriverAnnotation::from_json(driver_annotation)?;
        if annotation.locations.is_empty() {
            return Err(RetrieveError::NoLocations);
        }

        if self.cache.insert_pending(data_id).is_none() {
            debug!(data_id, "Retrieval already tracked");
            return Ok(());
        }

        debug!(
            data_id,
            locations = annotation.locations.len(),
            "Starting block data retrieval"
        );

        let task = RetrievalTask {
            data_id: data_id.to_string(),
            id,
            locations: annotation.locations,
            cache: self.cache.clone(),
            fetcher: self.fetcher.clone(),
            config: self.config.clone(),
            cancel: self.cancel.clone(),
        };
        self.tracker.spawn(task.run());

        Ok(())
    }

    async fn wait(&self) {
        // wait() only resolves on a closed tracker; reopen so later
        // retrievals are tracked again.
        self.tracker.close();
        self.tracker.wait().await;
        let _guard = self.lifecycle.lock();
        if !self.cancel.is_cancelled() {
            self.tracker.reopen();
        }
    }
}

struct RetrievalTask<F: ?Sized> {
    data_id: String,
    id: DataId,
    locations: Vec<String>,
    cache: Arc<RequestCache>,
    fetcher: Arc<F>,
    config: RetrievalConfig,
    cancel: CancellationToken,
}

impl<F> RetrievalTask<F>
where
    F: BlockDataFetcher + ?Sized,
{
    async fn run(self) {
        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(data_id = %self.data_id, "Retrieval cancelled");
                None
            }
            data = self.fetch_verified() => data,
        };

        match fetched {
            Some(data) => {
                let n_txs = data.transactions.len();
                if self.cache.mark_ready(&self.data_id, data) {
                    info!(
                        data_id = %self.data_id,
                        height = self.id.height,
                        round = self.id.round,
                        n_txs,
                        "Block data retrieved"
                    );
                }
            }
            None => {
                self.cache.remove_pending(&self.data_id);
            }
        }
    }

    async fn fetch_verified(&self) -> Option<BlockData> {
        let timeout = self.config.fetch_timeout();

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.config.retry_backoff()).await;
            }

            for location in &self.locations {
                match tokio::time::timeout(timeout, self.fetcher.fetch(location, &self.id)).await {
                    Ok(Ok(encoded)) => match verify_block_data(&self.id, encoded) {
                        Ok(data) => return Some(data),
                        Err(e) => debug!(
                            data_id = %self.data_id,
                            location = %location,
                            error = %e,
                            "Fetched block data failed verification"
                        ),
                    },
                    Ok(Err(e)) => debug!(
                        data_id = %self.data_id,
                        location = %location,
                        attempt,
                        error = %e,
                        "Block data fetch failed"
                    ),
                    Err(_) => debug!(
                        data_id = %self.data_id,
                        location = %location,
                        attempt,
                        timeout_ms = self.config.fetch_timeout_ms,
                        "Block data fetch timed out"
                    ),
                }
            }
        }

        warn!(
            data_id = %self.data_id,
            attempts = self.config.max_attempts,
            "Giving up on block data retrieval"
        );
        None
    }
}
