//! Type definitions for the RSS module.

use thiserror::Error;
use tokio::time::Duration;

/// Why a single fetch did not produce a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network, DNS, TLS, timeout, or body read failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The server answered with something other than 200 OK.
    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },
}

// Constants
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const FEED_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml, text/xml, */*;q=0.9";
pub const USER_AGENT: &str = concat!("feed_monitor/", env!("CARGO_PKG_VERSION"));
