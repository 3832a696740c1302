//! Admin HTTP surface.

pub mod api;

pub use self::api::{app_api_loop, router};

use std::collections::HashMap;

/// The action parameters the admin page understands. Each value is read with
/// [`intval`]; parameters that are absent stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdminQuery {
    pub download_feed_id: Option<i64>,
    pub view_feed_id: Option<i64>,
    pub delete_feed_id: Option<i64>,
}

impl AdminQuery {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            download_feed_id: params.get("download_feed_id").map(|v| intval(v)),
            view_feed_id: params.get("view_feed_id").map(|v| intval(v)),
            delete_feed_id: params.get("delete_feed_id").map(|v| intval(v)),
        }
    }
}

/// Lenient integer parse: optional leading whitespace and sign, then as many
/// digits as are present. No digits yields 0; overflow saturates.
pub fn intval(value: &str) -> i64 {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };

    let mut result: i64 = 0;
    for digit in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(digit - b'0');
        result = if negative {
            result.saturating_mul(10).saturating_sub(digit)
        } else {
            result.saturating_mul(10).saturating_add(digit)
        };
    }
    result
}
