//! Feed settings: the typed configuration, its validation, and the store that
//! persists it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::db::Database;
use crate::rss::normalize_feed_url;
use crate::TARGET_DB;

/// How often the scheduled fetch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchInterval {
    #[default]
    Hourly,
    Daily,
    Weekly,
}

impl FetchInterval {
    pub const ALL: [FetchInterval; 3] = [Self::Hourly, Self::Daily, Self::Weekly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }

    pub fn period(&self) -> Duration {
        match self {
            Self::Hourly => Duration::from_secs(60 * 60),
            Self::Daily => Duration::from_secs(24 * 60 * 60),
            Self::Weekly => Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    /// Lenient parse: anything unrecognized yields the default.
    pub fn parse_or_default(input: &str) -> Self {
        let input = input.trim();
        Self::ALL
            .into_iter()
            .find(|interval| interval.as_str().eq_ignore_ascii_case(input))
            .unwrap_or_else(|| {
                debug!("Unrecognized fetch interval {:?}, using default", input);
                Self::default()
            })
    }
}

impl fmt::Display for FetchInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long fetched payloads are kept before pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionWindow {
    #[default]
    Week,
    Month,
    Year,
}

impl RetentionWindow {
    pub const ALL: [RetentionWindow; 3] = [Self::Week, Self::Month, Self::Year];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    pub fn parse_or_default(input: &str) -> Self {
        let input = input.trim();
        Self::ALL
            .into_iter()
            .find(|window| window.as_str().eq_ignore_ascii_case(input))
            .unwrap_or_else(|| {
                debug!("Unrecognized retention window {:?}, using default", input);
                Self::default()
            })
    }
}

impl fmt::Display for RetentionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The complete, validated feed settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Normalized absolute http(s) URL, or empty when no feed is configured.
    pub feed_url: String,
    pub fetch_interval: FetchInterval,
    pub retention_window: RetentionWindow,
}

impl FeedConfig {
    pub fn has_feed(&self) -> bool {
        !self.feed_url.is_empty()
    }
}

/// Raw, unvalidated settings as submitted by a form or the command line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigCandidate {
    #[serde(default)]
    pub feed_url: String,
    #[serde(default)]
    pub fetch_interval: String,
    #[serde(default)]
    pub retention_window: String,
}

/// Which fields differ between the previous and the newly stored config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigChanges {
    pub url_changed: bool,
    pub interval_changed: bool,
}

impl ConfigChanges {
    pub fn between(previous: &FeedConfig, current: &FeedConfig) -> Self {
        Self {
            url_changed: previous.feed_url != current.feed_url,
            interval_changed: previous.fetch_interval != current.fetch_interval,
        }
    }

    /// A new URL or interval means the pending schedule must be replaced.
    pub fn needs_reschedule(&self) -> bool {
        self.url_changed || self.interval_changed
    }
}

/// Turns a candidate into a complete config. Never fails: a bad URL becomes
/// empty and unknown enum values fall back to their defaults.
pub fn validate(candidate: &ConfigCandidate) -> FeedConfig {
    FeedConfig {
        feed_url: normalize_feed_url(&candidate.feed_url).unwrap_or_default(),
        fetch_interval: FetchInterval::parse_or_default(&candidate.fetch_interval),
        retention_window: RetentionWindow::parse_or_default(&candidate.retention_window),
    }
}

/// Persists the feed settings in the `feed_monitor_options` table.
#[derive(Clone)]
pub struct ConfigStore {
    db: Database,
}

impl ConfigStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Current settings; defaults when nothing has been stored yet.
    pub async fn get(&self) -> Result<FeedConfig, sqlx::Error> {
        Ok(self.db.load_options().await?.unwrap_or_default())
    }

    /// Validates and stores `candidate`, reporting which fields changed.
    pub async fn set(
        &self,
        candidate: &ConfigCandidate,
    ) -> Result<(FeedConfig, ConfigChanges), sqlx::Error> {
        let previous = self.get().await?;
        let validated = validate(candidate);
        self.db.save_options(&validated).await?;

        let changes = ConfigChanges::between(&previous, &validated);
        info!(
            target: TARGET_DB,
            "Stored feed settings: url={:?} interval={} retention={} ({:?})",
            validated.feed_url,
            validated.fetch_interval,
            validated.retention_window,
            changes
        );
        Ok((validated, changes))
    }

    /// Writes the defaults unless settings already exist.
    pub async fn ensure_defaults(&self) -> Result<(), sqlx::Error> {
        self.db.insert_default_options(&FeedConfig::default()).await
    }
}
