//! Feed retrieval.
//!
//! Fetches the configured feed over HTTP and hands back the raw payload. The
//! payload is never parsed; it is stored and served as-is.

mod client;
mod fetcher;
mod types;
mod util;

pub use self::client::create_http_client;
pub use self::fetcher::{FeedFetcher, HttpFetcher};
pub use self::types::*;
pub use self::util::*;
