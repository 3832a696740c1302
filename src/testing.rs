//! Fetchers and fixtures shared by unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::config::{ConfigCandidate, ConfigStore};
use crate::db::Database;
use crate::rss::{FeedFetcher, FetchError};

/// Returns a fixed result and counts calls.
pub struct StubFetcher {
    result: Mutex<Result<Vec<u8>, FetchError>>,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn ok(payload: &[u8]) -> Arc<Self> {
        Self::with_result(Ok(payload.to_vec()))
    }

    pub fn failing(err: FetchError) -> Arc<Self> {
        Self::with_result(Err(err))
    }

    fn with_result(result: Result<Vec<u8>, FetchError>) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(result),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn set_result(&self, result: Result<Vec<u8>, FetchError>) {
        *self.result.lock().unwrap() = result;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        self.result.lock().unwrap().clone()
    }
}

/// Blocks every fetch until released, so tests can act mid-tick.
pub struct GatedFetcher {
    pub started: Notify,
    pub release: Notify,
    payload: Vec<u8>,
}

impl GatedFetcher {
    pub fn new(payload: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            started: Notify::new(),
            release: Notify::new(),
            payload: payload.to_vec(),
        })
    }
}

#[async_trait]
impl FeedFetcher for GatedFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(self.payload.clone())
    }
}

/// An in-memory database whose settings point at `feed_url`.
pub async fn configured_db(feed_url: &str) -> (Database, ConfigStore) {
    let db = Database::in_memory().await.unwrap();
    let config = ConfigStore::new(db.clone());
    config
        .set(&ConfigCandidate {
            feed_url: feed_url.to_string(),
            fetch_interval: "hourly".to_string(),
            retention_window: "week".to_string(),
        })
        .await
        .unwrap();
    (db, config)
}
