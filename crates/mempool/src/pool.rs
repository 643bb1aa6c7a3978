//! Speculative transaction buffer.
//!
//! The buffer keeps pending transactions in arrival order together with the
//! application state obtained by simulating all of them in sequence. A new
//! transaction is accepted only if it applies cleanly on top of that
//! accumulated state, so any prefix of [`TxBuffer::buffered`] is a valid
//! batch to propose.
//!
//! After a block commits, [`TxBuffer::rebase`] drops the committed
//! transactions and re-simulates the rest against fresh state.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use ballot_config::MempoolConfig;
use ballot_core::{AppManager, AppResult, Mempool, MempoolError, MempoolResult, TxFilter, TxResult};
use ballot_types::{Transaction, H256};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

/// Buffer contents. Guarded by one async lock because simulation runs with
/// the lock held.
struct BufferInner<S> {
    txs: Vec<Transaction>,
    hashes: HashSet<H256>,
    /// State after applying every buffered transaction, `None` when empty.
    state: Option<S>,
    total_bytes: usize,
}

impl<S> BufferInner<S> {
    fn new() -> Self {
        Self {
            txs: Vec::new(),
            hashes: HashSet::new(),
            state: None,
            total_bytes: 0,
        }
    }

    fn push(&mut self, tx: Transaction, state: S) {
        self.total_bytes += tx.size();
        self.hashes.insert(tx.hash());
        self.txs.push(tx);
        self.state = Some(state);
    }

    fn reset(&mut self) -> Vec<Transaction> {
        self.hashes.clear();
        self.total_bytes = 0;
        self.state = None;
        std::mem::take(&mut self.txs)
    }
}

/// [`Mempool`] implementation backed by an [`AppManager`].
pub struct TxBuffer<A: AppManager> {
    app: Arc<A>,
    config: MempoolConfig,
    inner: Mutex<BufferInner<A::State>>,
}

impl<A: AppManager> TxBuffer<A> {
    /// Creates an empty buffer.
    pub fn new(app: Arc<A>, config: MempoolConfig) -> Self {
        Self {
            app,
            config,
            inner: Mutex::new(BufferInner::new()),
        }
    }

    /// Limits this buffer was created with.
    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }

    /// Number of buffered transactions.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.txs.len()
    }

    /// Returns true if nothing is buffered.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.txs.is_empty()
    }

    /// Sum of buffered payload sizes.
    pub async fn total_bytes(&self) -> usize {
        self.inner.lock().await.total_bytes
    }

    /// Whether a transaction with this hash is buffered.
    pub async fn contains(&self, hash: &H256) -> bool {
        self.inner.lock().await.hashes.contains(hash)
    }

    /// Removes committed transactions and re-validates the remainder.
    ///
    /// Remaining transactions are simulated again in their original order on
    /// top of the latest committed state. Those that no longer apply, or that
    /// the application cannot evaluate, are evicted. Returns the hashes of the
    /// evicted transactions (committed ones are not included).
    pub async fn rebase(&self, committed: &[H256]) -> Vec<H256> {
        let committed: HashSet<H256> = committed.iter().copied().collect();

        let mut inner = self.inner.lock().await;
        let previous = inner.reset();
        let before = previous.len();
        let mut evicted = Vec::new();

        for tx in previous {
            let hash = tx.hash();
            if committed.contains(&hash) {
                continue;
            }

            match self.simulate_on(inner.state.clone(), &tx).await {
                Ok((result, state)) if result.is_ok() => inner.push(tx, state),
                Ok((result, _)) => {
                    debug!(
                        tx_hash = %hash,
                        reason = result.error.as_deref().unwrap_or_default(),
                        "Evicting transaction that no longer applies"
                    );
                    evicted.push(hash);
                }
                Err(e) => {
                    warn!(
                        tx_hash = %hash,
                        error = %e,
                        "Evicting transaction after simulation failure"
                    );
                    evicted.push(hash);
                }
            }
        }

        info!(
            before,
            committed = committed.len(),
            evicted = evicted.len(),
            remaining = inner.txs.len(),
            "Transaction buffer rebased"
        );

        evicted
    }

    /// Drops every buffered transaction.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        let dropped = inner.reset().len();
        debug!(dropped, "Transaction buffer cleared");
    }

    async fn simulate_on(
        &self,
        state: Option<A::State>,
        tx: &Transaction,
    ) -> AppResult<(TxResult, A::State)> {
        match state {
            Some(state) => self.app.simulate_with_state(state, tx).await,
            None => self.app.simulate(tx).await,
        }
    }
}

#[async_trait]
impl<A: AppManager> Mempool for TxBuffer<A> {
    async fn buffered(&self, filter: Option<&TxFilter>) -> Vec<Transaction> {
        let inner = self.inner.lock().await;
        match filter {
            None => inner.txs.clone(),
            Some(keep) => inner.txs.iter().filter(|tx| keep(tx)).cloned().collect(),
        }
    }

    async fn add_tx(&self, tx: Transaction) -> MempoolResult<()> {
        let hash = tx.hash();
        let size = tx.size();

        trace!(tx_hash = %hash, size, "Adding transaction to buffer");

        if size > self.config.max_tx_size {
            return Err(MempoolError::TxTooLarge {
                size,
                max: self.config.max_tx_size,
            });
        }

        let mut inner = self.inner.lock().await;

        if inner.hashes.contains(&hash) {
            return Err(MempoolError::AlreadyExists(hash));
        }
        if inner.txs.len() >= self.config.max_txs
            || inner.total_bytes + size > self.config.max_bytes
        {
            return Err(MempoolError::PoolFull);
        }

        let (result, state) = self.simulate_on(inner.state.clone(), &tx).await?;
        if let Some(reason) = result.error {
            debug!(tx_hash = %hash, reason = %reason, "Transaction rejected by application");
            return Err(MempoolError::Rejected(reason));
        }

        inner.push(tx, state);

        debug!(
            tx_hash = %hash,
            size,
            gas_used = result.gas_used,
            buffered = inner.txs.len(),
            "Transaction buffered"
        );

        Ok(())
    }
}
