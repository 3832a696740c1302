pub mod app;
pub mod clock;
pub mod config;
pub mod db;
pub mod environment;
pub mod logging;
pub mod monitor;
pub mod retention;
pub mod rss;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_DB: &str = "db_query";
pub const TARGET_SCHEDULER: &str = "scheduler";

pub use config::{ConfigCandidate, FeedConfig, FetchInterval, RetentionWindow};
pub use monitor::FeedMonitor;
