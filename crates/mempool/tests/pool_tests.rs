//! Tests for the transaction buffer.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use ballot_config::MempoolConfig;
use ballot_core::{AppError, AppManager, AppResult, Mempool, MempoolError, TxFilter, TxResult};
use ballot_mempool::TxBuffer;
use ballot_types::Transaction;
use parking_lot::Mutex;

/// Toy ledger. `spend:<key>[/<tag>]` spends `key` once; payloads starting
/// with `bad` are rejected and `unavailable` cannot be evaluated.
#[derive(Default)]
struct MockApp {
    committed: Mutex<HashSet<String>>,
}

impl MockApp {
    fn commit_spend(&self, key: &str) {
        self.committed.lock().insert(key.to_string());
    }

    fn apply(
        &self,
        mut spent: HashSet<String>,
        tx: &Transaction,
    ) -> AppResult<(TxResult, HashSet<String>)> {
        let payload = String::from_utf8_lossy(tx.payload()).to_string();

        if payload.starts_with("unavailable") {
            return Err(AppError::StateUnavailable("store offline".to_string()));
        }
        if payload.starts_with("bad") {
            return Ok((TxResult::rejected("bad transaction"), spent));
        }
        if let Some(rest) = payload.strip_prefix("spend:") {
            let key = rest.split('/').next().unwrap_or_default().to_string();
            if spent.contains(&key) || self.committed.lock().contains(&key) {
                return Ok((TxResult::rejected(format!("{key} already spent")), spent));
            }
            spent.insert(key);
        }
        Ok((TxResult::ok(21_000), spent))
    }
}

#[async_trait]
impl AppManager for MockApp {
    type State = HashSet<String>;

    async fn simulate(&self, tx: &Transaction) -> AppResult<(TxResult, Self::State)> {
        self.apply(HashSet::new(), tx)
    }

    async fn simulate_with_state(
        &self,
        state: Self::State,
        tx: &Transaction,
    ) -> AppResult<(TxResult, Self::State)> {
        self.apply(state, tx)
    }
}

fn tx(payload: &str) -> Transaction {
    Transaction::new(payload.as_bytes().to_vec())
}

fn create_buffer() -> (Arc<MockApp>, TxBuffer<MockApp>) {
    let app = Arc::new(MockApp::default());
    let buffer = TxBuffer::new(app.clone(), MempoolConfig::default());
    (app, buffer)
}

fn payloads(txs: &[Transaction]) -> Vec<String> {
    txs.iter()
        .map(|t| String::from_utf8_lossy(t.payload()).to_string())
        .collect()
}

#[tokio::test]
async fn test_empty_buffer() {
    let (_, buffer) = create_buffer();
    assert!(buffer.is_empty().await);
    assert_eq!(buffer.len().await, 0);
    assert_eq!(buffer.total_bytes().await, 0);
    assert!(buffer.buffered(None).await.is_empty());
}

#[tokio::test]
async fn test_buffered_preserves_insertion_order() {
    let (_, buffer) = create_buffer();
    for p in ["spend:c", "spend:a", "spend:b"] {
        buffer.add_tx(tx(p)).await.unwrap();
    }

    assert_eq!(
        payloads(&buffer.buffered(None).await),
        vec!["spend:c", "spend:a", "spend:b"]
    );
    assert_eq!(buffer.len().await, 3);
    assert_eq!(buffer.total_bytes().await, 21);
    assert!(buffer.contains(&tx("spend:a").hash()).await);
}

#[tokio::test]
async fn test_duplicate_rejected() {
    let (_, buffer) = create_buffer();
    let t = tx("hello");
    buffer.add_tx(t.clone()).await.unwrap();

    let err = buffer.add_tx(t.clone()).await.unwrap_err();
    assert!(matches!(err, MempoolError::AlreadyExists(h) if h == t.hash()));
    assert_eq!(buffer.len().await, 1);
}

#[tokio::test]
async fn test_size_limits() {
    let app = Arc::new(MockApp::default());
    let buffer = TxBuffer::new(
        app,
        MempoolConfig {
            max_txs: 2,
            max_bytes: 10,
            max_tx_size: 6,
        },
    );

    assert!(matches!(
        buffer.add_tx(tx("1234567")).await,
        Err(MempoolError::TxTooLarge { size: 7, max: 6 })
    ));

    buffer.add_tx(tx("123456")).await.unwrap();
    // 6 + 5 > 10
    assert!(matches!(buffer.add_tx(tx("abcde")).await, Err(MempoolError::PoolFull)));

    buffer.add_tx(tx("abcd")).await.unwrap();
    // Count limit reached
    assert!(matches!(buffer.add_tx(tx("z")).await, Err(MempoolError::PoolFull)));
}

#[tokio::test]
async fn test_business_rejection() {
    let (_, buffer) = create_buffer();
    let err = buffer.add_tx(tx("bad transfer")).await.unwrap_err();
    assert!(matches!(err, MempoolError::Rejected(ref r) if r == "bad transaction"));
    assert!(buffer.is_empty().await);
}

#[tokio::test]
async fn test_state_failure() {
    let (_, buffer) = create_buffer();
    let err = buffer.add_tx(tx("unavailable")).await.unwrap_err();
    assert!(matches!(
        err,
        MempoolError::Simulation(AppError::StateUnavailable(_))
    ));
    assert!(buffer.is_empty().await);
}

#[tokio::test]
async fn test_simulates_against_accumulated_state() {
    let (_, buffer) = create_buffer();
    buffer.add_tx(tx("spend:a")).await.unwrap();
    buffer.add_tx(tx("spend:b")).await.unwrap();

    // Conflicts with the buffered spend, not with committed state
    let err = buffer.add_tx(tx("spend:a/second")).await.unwrap_err();
    assert!(matches!(err, MempoolError::Rejected(_)));

    // A rejected transaction does not advance the state
    buffer.add_tx(tx("spend:c")).await.unwrap();
    assert_eq!(buffer.len().await, 3);
}

#[tokio::test]
async fn test_filtered_snapshot() {
    let (_, buffer) = create_buffer();
    for p in ["spend:a", "note", "spend:b"] {
        buffer.add_tx(tx(p)).await.unwrap();
    }

    let spends_only: &TxFilter = &|t: &Transaction| t.has_prefix(b"spend:");
    assert_eq!(
        payloads(&buffer.buffered(Some(spends_only)).await),
        vec!["spend:a", "spend:b"]
    );

    let nothing: &TxFilter = &|_: &Transaction| false;
    assert!(buffer.buffered(Some(nothing)).await.is_empty());
}

#[tokio::test]
async fn test_rebase_drops_committed_and_conflicting() {
    let (app, buffer) = create_buffer();
    let committed_tx = tx("spend:a");
    for p in ["spend:a", "spend:b", "spend:c", "note"] {
        buffer.add_tx(tx(p)).await.unwrap();
    }

    // The block spent `a` (ours) and `c` (someone else's transaction)
    app.commit_spend("a");
    app.commit_spend("c");

    let evicted = buffer.rebase(&[committed_tx.hash()]).await;

    assert_eq!(evicted, vec![tx("spend:c").hash()]);
    assert_eq!(payloads(&buffer.buffered(None).await), vec!["spend:b", "note"]);
    assert_eq!(buffer.total_bytes().await, "spend:b".len() + "note".len());
    assert!(!buffer.contains(&committed_tx.hash()).await);
}

#[tokio::test]
async fn test_rebase_resets_speculative_state() {
    let (app, buffer) = create_buffer();
    let first = tx("spend:a");
    buffer.add_tx(first.clone()).await.unwrap();

    app.commit_spend("a");
    assert!(buffer.rebase(&[first.hash()]).await.is_empty());
    assert!(buffer.is_empty().await);

    // `a` is now committed; `b` applies to fresh state
    assert!(buffer.add_tx(tx("spend:a/again")).await.is_err());
    buffer.add_tx(tx("spend:b")).await.unwrap();
}

#[tokio::test]
async fn test_clear() {
    let (_, buffer) = create_buffer();
    buffer.add_tx(tx("spend:a")).await.unwrap();
    buffer.clear().await;
    assert!(buffer.is_empty().await);

    // Same spend is accepted again after clearing
    buffer.add_tx(tx("spend:a")).await.unwrap();
}

#[tokio::test]
async fn test_usable_as_trait_object() {
    let (_, buffer) = create_buffer();
    let mempool: Arc<dyn Mempool> = Arc::new(buffer);

    mempool.add_tx(tx("spend:x")).await.unwrap();
    assert_eq!(mempool.buffered(None).await.len(), 1);
}
