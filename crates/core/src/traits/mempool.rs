//! Pending transaction buffer traits.

use async_trait::async_trait;
use ballot_types::{Transaction, H256};
use thiserror::Error;

use super::AppError;

/// Predicate used to narrow a buffered snapshot.
pub type TxFilter = dyn Fn(&Transaction) -> bool + Send + Sync;

/// Errors that can occur when adding to the mempool.
#[derive(Error, Debug)]
pub enum MempoolError {
    /// Transaction already exists in the buffer.
    #[error("transaction already buffered: {0}")]
    AlreadyExists(H256),

    /// Buffer is at capacity.
    #[error("mempool is full")]
    PoolFull,

    /// Single transaction exceeds the size limit.
    #[error("transaction too large: {size} > {max}")]
    TxTooLarge {
        /// Actual size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// The application rejected the transaction during simulation.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The application could not evaluate the transaction.
    #[error("simulation failed: {0}")]
    Simulation(#[from] AppError),
}

/// Result type for mempool operations.
pub type MempoolResult<T> = Result<T, MempoolError>;

/// Source of pending transactions for block proposals.
#[async_trait]
pub trait Mempool: Send + Sync {
    /// Returns the currently buffered transactions, in the order they would be
    /// proposed. With `None` the full snapshot is returned.
    async fn buffered(&self, filter: Option<&TxFilter>) -> Vec<Transaction>;

    /// Adds a transaction to the buffer.
    async fn add_tx(&self, tx: Transaction) -> MempoolResult<()>;
}
