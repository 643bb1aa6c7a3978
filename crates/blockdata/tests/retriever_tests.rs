//! Tests for background retrieval and the in-memory store

use async_trait::async_trait;
use ballot_blockdata::{
    BlockDataFetcher, BlockDataProvider, BlockDataRetriever, DataId, FetchError,
    MemoryBlockDataStore, ProposalDriverAnnotation, ProposedBlockDataRetriever, ProvideError,
    RequestCache, RetrieveError,
};
use ballot_config::{BlockDataConfig, RetrievalConfig};
use ballot_types::Transaction;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn txs(payloads: &[&str]) -> Vec<Transaction> {
    payloads
        .iter()
        .map(|p| Transaction::new(p.as_bytes().to_vec()))
        .collect()
}

fn annotation(locations: &[String]) -> Vec<u8> {
    ProposalDriverAnnotation::new(locations.to_vec())
        .to_json()
        .unwrap()
}

fn fast_retrieval() -> RetrievalConfig {
    RetrievalConfig {
        max_attempts: 2,
        fetch_timeout_ms: 50,
        retry_backoff_ms: 10,
    }
}

fn retriever_over<F: BlockDataFetcher + 'static>(
    fetcher: Arc<F>,
) -> (Arc<RequestCache>, ProposedBlockDataRetriever<F>) {
    let cache = Arc::new(RequestCache::new());
    let retriever = ProposedBlockDataRetriever::new(
        cache.clone(),
        fetcher,
        fast_retrieval(),
        BlockDataConfig::default().max_data_bytes,
    );
    (cache, retriever)
}

/// Counts calls and delegates to a store.
struct CountingFetcher {
    inner: Arc<MemoryBlockDataStore>,
    calls: AtomicUsize,
}

#[async_trait]
impl BlockDataFetcher for CountingFetcher {
    async fn fetch(&self, location: &str, id: &DataId) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(location, id).await
    }
}

/// Never answers.
struct HangingFetcher;

#[async_trait]
impl BlockDataFetcher for HangingFetcher {
    async fn fetch(&self, _location: &str, _id: &DataId) -> Result<Bytes, FetchError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(FetchError::Transport("unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_provide_stores_batch() {
    let store = MemoryBlockDataStore::default();
    let batch = txs(&["a", "b"]);

    let provided = store.provide(10, 0, &batch).await.unwrap();
    let (expected, encoded) = DataId::for_transactions(10, 0, &batch);

    assert_eq!(provided.data_id, expected.to_string());
    assert_eq!(provided.encoded, encoded);
    assert_eq!(provided.addrs, vec![format!("mem://local/{}", provided.data_id)]);
    assert!(store.contains(&provided.data_id));
}

#[tokio::test]
async fn test_provide_rejects_empty_and_oversized() {
    let store = MemoryBlockDataStore::new(&BlockDataConfig {
        max_data_bytes: 8,
        location_prefix: "mem://tiny/".to_string(),
    });

    assert!(matches!(
        store.provide(1, 0, &[]).await,
        Err(ProvideError::EmptyBatch)
    ));
    assert!(matches!(
        store.provide(1, 0, &txs(&["a payload that is far too long"])).await,
        Err(ProvideError::TooLarge { max: 8, .. })
    ));
    assert_eq!(store.location_for("x"), "mem://tiny/x");
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_fetch_unknown_location() {
    let store = MemoryBlockDataStore::default();
    let id = DataId::empty(1, 0);

    assert!(matches!(
        store.fetch("http://elsewhere/1", &id).await,
        Err(FetchError::UnsupportedLocation(_))
    ));
    assert!(matches!(
        store.fetch("mem://local/missing", &id).await,
        Err(FetchError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_retrieve_marks_ready() {
    let store = Arc::new(MemoryBlockDataStore::default());
    let batch = txs(&["one", "two", "three"]);
    let provided = store.provide(10, 0, &batch).await.unwrap();

    let (cache, retriever) = retriever_over(store.clone());
    retriever
        .retrieve(&provided.data_id, &annotation(&provided.addrs))
        .unwrap();

    let request = cache.get(&provided.data_id).unwrap();
    retriever.wait().await;

    assert!(request.is_ready());
    let data = request.data().unwrap();
    assert_eq!(data.transactions, batch);
    assert_eq!(data.encoded, provided.encoded);
    assert_eq!(retriever.in_flight(), 0);
}

#[tokio::test]
async fn test_retrieve_validates_inputs() {
    let store = Arc::new(MemoryBlockDataStore::default());
    let provided = store.provide(2, 0, &txs(&["x"])).await.unwrap();
    let (cache, retriever) = retriever_over(store.clone());

    assert!(matches!(
        retriever.retrieve("not-an-id", &annotation(&provided.addrs)),
        Err(RetrieveError::InvalidDataId(_))
    ));
    assert!(matches!(
        retriever.retrieve(&DataId::empty(2, 0).to_string(), &annotation(&provided.addrs)),
        Err(RetrieveError::EmptyBatch)
    ));
    assert!(matches!(
        retriever.retrieve(&provided.data_id, b"not json"),
        Err(RetrieveError::InvalidAnnotation(_))
    ));
    assert!(matches!(
        retriever.retrieve(&provided.data_id, &annotation(&[])),
        Err(RetrieveError::NoLocations)
    ));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_retrieve_rejects_oversized_claims() {
    let store = Arc::new(MemoryBlockDataStore::default());
    let cache = Arc::new(RequestCache::new());
    let retriever = ProposedBlockDataRetriever::new(cache, store, fast_retrieval(), 16);

    let huge = DataId::new(1, 0, 1, 17, ballot_types::H256::keccak256(b"x")).to_string();
    assert!(matches!(
        retriever.retrieve(&huge, &annotation(&["mem://local/x".to_string()])),
        Err(RetrieveError::TooLarge { data_len: 17, max: 16 })
    ));
}

#[tokio::test]
async fn test_concurrent_requests_are_deduplicated() {
    let store = Arc::new(MemoryBlockDataStore::default());
    let provided = store.provide(3, 1, &txs(&["dup"])).await.unwrap();
    let fetcher = Arc::new(CountingFetcher {
        inner: store,
        calls: AtomicUsize::new(0),
    });

    let (cache, retriever) = retriever_over(fetcher.clone());
    let ann = annotation(&provided.addrs);
    retriever.retrieve(&provided.data_id, &ann).unwrap();
    retriever.retrieve(&provided.data_id, &ann).unwrap();
    retriever.wait().await;

    // Already ready: no new task
    retriever.retrieve(&provided.data_id, &ann).unwrap();
    retriever.wait().await;

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert!(cache.get(&provided.data_id).unwrap().is_ready());
}

#[tokio::test]
async fn test_falls_through_to_next_location() {
    let store = Arc::new(MemoryBlockDataStore::default());
    let provided = store.provide(4, 0, &txs(&["fallback"])).await.unwrap();
    let (cache, retriever) = retriever_over(store.clone());

    let mut locations = vec![
        "mem://local/wrong-key".to_string(),
        "udp://nowhere".to_string(),
    ];
    locations.extend(provided.addrs.clone());

    retriever
        .retrieve(&provided.data_id, &annotation(&locations))
        .unwrap();
    retriever.wait().await;

    assert!(cache.get(&provided.data_id).unwrap().is_ready());
}

#[tokio::test]
async fn test_corrupt_payload_removes_record() {
    let store = Arc::new(MemoryBlockDataStore::default());
    let provided = store.provide(5, 0, &txs(&["genuine"])).await.unwrap();
    store.insert(&provided.data_id, Bytes::from_static(b"forged!!"));

    let (cache, retriever) = retriever_over(store.clone());
    let ann = annotation(&provided.addrs);
    retriever.retrieve(&provided.data_id, &ann).unwrap();
    retriever.wait().await;
    assert!(cache.get(&provided.data_id).is_none());

    // Once the genuine bytes are back a fresh retrieval succeeds
    store.insert(&provided.data_id, provided.encoded.clone());
    retriever.retrieve(&provided.data_id, &ann).unwrap();
    retriever.wait().await;
    assert!(cache.get(&provided.data_id).unwrap().is_ready());
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_exhaust_attempts() {
    let (cache, retriever) = retriever_over(Arc::new(HangingFetcher));
    let id = DataId::for_transactions(6, 0, &txs(&["slow"])).0.to_string();

    retriever
        .retrieve(&id, &annotation(&["mem://local/slow".to_string()]))
        .unwrap();
    assert!(cache.get(&id).is_some());

    retriever.wait().await;
    assert!(cache.get(&id).is_none());
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight() {
    let cache = Arc::new(RequestCache::new());
    let retriever = ProposedBlockDataRetriever::new(
        cache.clone(),
        Arc::new(HangingFetcher),
        RetrievalConfig {
            max_attempts: 5,
            fetch_timeout_ms: 60_000,
            retry_backoff_ms: 0,
        },
        1024,
    );
    let id = DataId::for_transactions(7, 0, &txs(&["stuck"])).0.to_string();
    let ann = annotation(&["mem://local/stuck".to_string()]);

    retriever.retrieve(&id, &ann).unwrap();
    assert_eq!(retriever.in_flight(), 1);

    tokio::time::timeout(Duration::from_secs(5), retriever.shutdown())
        .await
        .unwrap();

    assert_eq!(retriever.in_flight(), 0);
    assert!(cache.get(&id).is_none());
    assert!(matches!(
        retriever.retrieve(&id, &ann),
        Err(RetrieveError::ShuttingDown)
    ));
}

#[tokio::test]
async fn test_retriever_as_trait_object() {
    let store = Arc::new(MemoryBlockDataStore::default());
    let provided = store.provide(8, 2, &txs(&["dyn"])).await.unwrap();

    let cache = Arc::new(RequestCache::new());
    let fetcher: Arc<dyn BlockDataFetcher> = store;
    let retriever: Arc<dyn BlockDataRetriever> = Arc::new(ProposedBlockDataRetriever::new(
        cache.clone(),
        fetcher,
        fast_retrieval(),
        1024,
    ));

    retriever
        .retrieve(&provided.data_id, &annotation(&provided.addrs))
        .unwrap();
    retriever.wait().await;
    assert!(cache.get(&provided.data_id).unwrap().is_ready());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_completes_while_waiting() {
    let store = Arc::new(MemoryBlockDataStore::default());
    let provided = store.provide(9, 0, &txs(&["race"])).await.unwrap();
    let ann = annotation(&provided.addrs);

    for _ in 0..200 {
        let (_, retriever) = retriever_over(store.clone());
        let retriever = Arc::new(retriever);
        retriever.retrieve(&provided.data_id, &ann).unwrap();

        let waiter = {
            let retriever = retriever.clone();
            tokio::spawn(async move { retriever.wait().await })
        };
        let stopper = {
            let retriever = retriever.clone();
            tokio::spawn(async move { retriever.shutdown().await })
        };

        tokio::time::timeout(Duration::from_secs(5), async {
            waiter.await.unwrap();
            stopper.await.unwrap();
        })
        .await
        .expect("shutdown did not drain");

        assert!(matches!(
            retriever.retrieve(&provided.data_id, &ann),
            Err(RetrieveError::ShuttingDown)
        ));
    }
}
