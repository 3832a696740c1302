//! HTTP client creation for feed requests.

use anyhow::Result;
use reqwest::cookie::Jar;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::debug;

use super::types::{FEED_ACCEPT, USER_AGENT};
use crate::TARGET_WEB_REQUEST;

/// Builds the shared client used for every feed request.
pub fn create_http_client(request_timeout: Duration) -> Result<reqwest::Client> {
    debug!(target: TARGET_WEB_REQUEST, "Creating HTTP client with {:?} connect timeout", request_timeout);

    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(FEED_ACCEPT));

    reqwest::Client::builder()
        .cookie_provider(Arc::new(Jar::default()))
        .gzip(true)
        .redirect(reqwest::redirect::Policy::default())
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .connect_timeout(request_timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))
}
