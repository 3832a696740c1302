use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::ConfigStore;
use crate::db::Database;
use crate::retention;
use crate::rss::{FeedFetcher, FetchError};
use crate::TARGET_SCHEDULER;

/// What a single run of the fetch job did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No feed URL is configured; nothing was fetched.
    NoFeedConfigured,
    /// The fetch failed; nothing was stored or pruned.
    FetchFailed(FetchError),
    /// The payload was stored as `record_id`, and `pruned` expired rows removed.
    Stored { record_id: i64, pruned: u64 },
    /// Settings could not be read or the payload could not be written.
    StorageFailed(String),
}

/// Fetch the configured feed, store it, then prune expired records.
pub struct FeedFetchJob {
    db: Database,
    config: ConfigStore,
    fetcher: Arc<dyn FeedFetcher>,
    clock: Arc<dyn Clock>,
}

impl FeedFetchJob {
    pub fn new(
        db: Database,
        config: ConfigStore,
        fetcher: Arc<dyn FeedFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            config,
            fetcher,
            clock,
        }
    }

    pub async fn run(&self) -> TickOutcome {
        let config = match self.config.get().await {
            Ok(config) => config,
            Err(err) => {
                error!(target: TARGET_SCHEDULER, "Failed to load feed settings: {}", err);
                return TickOutcome::StorageFailed(err.to_string());
            }
        };

        if !config.has_feed() {
            debug!(target: TARGET_SCHEDULER, "No feed URL configured, skipping fetch");
            return TickOutcome::NoFeedConfigured;
        }

        let payload = match self.fetcher.fetch(&config.feed_url).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(target: TARGET_SCHEDULER, "Error fetching feed {}: {}", config.feed_url, err);
                return TickOutcome::FetchFailed(err);
            }
        };

        let now = self.clock.now();
        let record_id = match self
            .db
            .insert_feed_record(&config.feed_url, &payload, now)
            .await
        {
            Ok(id) => id,
            Err(err) => {
                error!(target: TARGET_SCHEDULER, "Failed to store feed from {}: {}", config.feed_url, err);
                return TickOutcome::StorageFailed(err.to_string());
            }
        };

        let cutoff = retention::cutoff(now, config.retention_window);
        let pruned = match self.db.delete_feed_records_older_than(cutoff).await {
            Ok(count) => count,
            Err(err) => {
                // The payload is stored; pruning is retried on the next tick.
                error!(target: TARGET_SCHEDULER, "Failed to prune records older than {}: {}", cutoff, err);
                0
            }
        };

        info!(
            target: TARGET_SCHEDULER,
            "Stored feed record {} from {} ({} bytes), pruned {} older than {}",
            record_id,
            config.feed_url,
            payload.len(),
            pruned,
            config.retention_window
        );
        TickOutcome::Stored { record_id, pruned }
    }
}
