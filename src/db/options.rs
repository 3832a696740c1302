use sqlx::Row;
use tracing::{debug, instrument};

use super::core::Database;
use crate::config::{FeedConfig, FetchInterval, RetentionWindow};
use crate::TARGET_DB;

impl Database {
    pub(crate) async fn load_options(&self) -> Result<Option<FeedConfig>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT feed_url, fetch_interval, retention_window FROM feed_monitor_options WHERE id = 1",
        )
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|row| FeedConfig {
            feed_url: row.get("feed_url"),
            fetch_interval: FetchInterval::parse_or_default(&row.get::<String, _>("fetch_interval")),
            retention_window: RetentionWindow::parse_or_default(&row.get::<String, _>("retention_window")),
        }))
    }

    #[instrument(target = "db", level = "info", skip(self))]
    pub(crate) async fn save_options(&self, config: &FeedConfig) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO feed_monitor_options (id, feed_url, fetch_interval, retention_window)
            VALUES (1, ?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                feed_url = excluded.feed_url,
                fetch_interval = excluded.fetch_interval,
                retention_window = excluded.retention_window
            "#,
        )
        .bind(&config.feed_url)
        .bind(config.fetch_interval.as_str())
        .bind(config.retention_window.as_str())
        .execute(self.pool())
        .await?;

        debug!(target: TARGET_DB, "Saved feed monitor options");
        Ok(())
    }

    pub(crate) async fn insert_default_options(
        &self,
        defaults: &FeedConfig,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO feed_monitor_options (id, feed_url, fetch_interval, retention_window)
            VALUES (1, ?1, ?2, ?3)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&defaults.feed_url)
        .bind(defaults.fetch_interval.as_str())
        .bind(defaults.retention_window.as_str())
        .execute(self.pool())
        .await?;

        if result.rows_affected() > 0 {
            debug!(target: TARGET_DB, "Inserted default feed monitor options");
        }
        Ok(())
    }
}
