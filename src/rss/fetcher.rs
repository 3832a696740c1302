//! Single-shot feed fetching.

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::client::create_http_client;
use super::types::FetchError;
use crate::TARGET_WEB_REQUEST;

/// Retrieves the raw bytes behind a feed URL.
///
/// One call makes at most one request. Retrying is left to the caller.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches feeds with a pooled `reqwest` client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(request_timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: create_http_client(request_timeout)?,
            request_timeout,
        })
    }

    async fn fetch_inner(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        debug!(target: TARGET_WEB_REQUEST, "Request to {} returned status {}", url, status);
        if status != StatusCode::OK {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| FetchError::Transport(format!("failed to read body: {}", err)))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(target: TARGET_WEB_REQUEST, "Loading feed from {}", url);

        // Bounds the whole exchange, body read included.
        match timeout(self.request_timeout, self.fetch_inner(url)).await {
            Ok(Ok(payload)) => {
                info!(target: TARGET_WEB_REQUEST, "Fetched {} bytes from {}", payload.len(), url);
                Ok(payload)
            }
            Ok(Err(err)) => {
                warn!(target: TARGET_WEB_REQUEST, "Fetch of {} failed: {}", url, err);
                Err(err)
            }
            Err(_) => {
                warn!(target: TARGET_WEB_REQUEST, "Request to {} timed out", url);
                Err(FetchError::Transport(format!(
                    "request timed out after {} seconds",
                    self.request_timeout.as_secs()
                )))
            }
        }
    }
}
