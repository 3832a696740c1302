//! Utility functions for feed URLs.

use url::{ParseError, Url};

/// Parses `input` as an absolute http(s) URL and returns its canonical
/// serialization. Input without a scheme, such as `example.com/feed.xml`, is
/// read as `http://`. Returns `None` for anything else.
pub fn normalize_feed_url(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = match Url::parse(trimmed) {
        Ok(parsed) => parsed,
        Err(ParseError::RelativeUrlWithoutBase) if !trimmed.starts_with(['/', '#', '?']) => {
            Url::parse(&format!("http://{}", trimmed)).ok()?
        }
        Err(_) => return None,
    };
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Some(parsed.to_string()),
        _ => None,
    }
}
