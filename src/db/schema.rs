use tracing::info;

use super::core::Database;
use crate::TARGET_DB;

impl Database {
    /// Creates the tables if they do not exist yet. Safe to run on every start.
    pub(crate) async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feed_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                feed_url TEXT NOT NULL,
                feed_data BLOB NOT NULL,
                retrieved_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_feed_records_retrieved_at ON feed_records (retrieved_at);

            -- Single-row settings table
            CREATE TABLE IF NOT EXISTS feed_monitor_options (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                feed_url TEXT NOT NULL,
                fetch_interval TEXT NOT NULL,
                retention_window TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await?;

        info!(target: TARGET_DB, "Database schema initialized");
        Ok(())
    }
}
