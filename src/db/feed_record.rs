use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::{debug, info, instrument};

use super::core::{format_timestamp, parse_timestamp, Database};
use crate::TARGET_DB;

/// One stored fetch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRecord {
    pub id: i64,
    pub feed_url: String,
    pub feed_data: Vec<u8>,
    pub retrieved_at: DateTime<Utc>,
}

/// A stored fetch result without its payload, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedRecordSummary {
    pub id: i64,
    pub feed_url: String,
    pub retrieved_at: DateTime<Utc>,
    pub size_bytes: i64,
}

impl FeedRecord {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            feed_url: row.try_get("feed_url")?,
            feed_data: row.try_get("feed_data")?,
            retrieved_at: parse_timestamp(row.try_get("retrieved_at")?)?,
        })
    }
}

impl FeedRecordSummary {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            feed_url: row.try_get("feed_url")?,
            retrieved_at: parse_timestamp(row.try_get("retrieved_at")?)?,
            size_bytes: row.try_get("size_bytes")?,
        })
    }
}

impl Database {
    /// Appends a fetched payload. Duplicate payloads get their own rows.
    #[instrument(target = "db", level = "info", skip(self, feed_data))]
    pub async fn insert_feed_record(
        &self,
        feed_url: &str,
        feed_data: &[u8],
        retrieved_at: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO feed_records (feed_url, feed_data, retrieved_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(feed_url)
        .bind(feed_data)
        .bind(format_timestamp(retrieved_at))
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        debug!(target: TARGET_DB, "Stored feed record {} ({} bytes) from {}", id, feed_data.len(), feed_url);
        Ok(id)
    }

    /// All records, newest first.
    pub async fn list_feed_records(&self) -> Result<Vec<FeedRecord>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, feed_url, feed_data, retrieved_at
            FROM feed_records
            ORDER BY retrieved_at DESC, id DESC
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(FeedRecord::from_row).collect()
    }

    /// Same order as [`list_feed_records`](Self::list_feed_records), without payloads.
    pub async fn list_feed_record_summaries(&self) -> Result<Vec<FeedRecordSummary>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, feed_url, retrieved_at, length(feed_data) AS size_bytes
            FROM feed_records
            ORDER BY retrieved_at DESC, id DESC
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(FeedRecordSummary::from_row).collect()
    }

    pub async fn get_feed_record(&self, id: i64) -> Result<Option<FeedRecord>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, feed_url, feed_data, retrieved_at FROM feed_records WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(FeedRecord::from_row).transpose()
    }

    /// Returns true if a row existed and was removed.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn delete_feed_record(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM feed_records WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(target: TARGET_DB, "Deleted feed record {}", id);
        } else {
            debug!(target: TARGET_DB, "No feed record {} to delete", id);
        }
        Ok(deleted)
    }

    /// Removes every record retrieved strictly before `cutoff`.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn delete_feed_records_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM feed_records WHERE retrieved_at < ?1")
            .bind(format_timestamp(cutoff))
            .execute(self.pool())
            .await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            info!(target: TARGET_DB, "Pruned {} feed records older than {}", deleted, cutoff);
        }
        Ok(deleted)
    }

    pub async fn count_feed_records(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM feed_records")
            .fetch_one(self.pool())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetentionWindow;
    use crate::retention;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::in_memory().await.unwrap();
        let id = db
            .insert_feed_record("https://example.com/feed", b"<rss/>", now())
            .await
            .unwrap();

        let record = db.get_feed_record(id).await.unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.feed_url, "https://example.com/feed");
        assert_eq!(record.feed_data, b"<rss/>".to_vec());
        assert_eq!(record.retrieved_at, now());

        assert!(db.get_feed_record(id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_payloads_get_separate_rows() {
        let db = Database::in_memory().await.unwrap();
        let first = db.insert_feed_record("u", b"same", now()).await.unwrap();
        let second = db.insert_feed_record("u", b"same", now()).await.unwrap();
        assert!(second > first);
        assert_eq!(db.count_feed_records().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let db = Database::in_memory().await.unwrap();
        let old = db
            .insert_feed_record("u", b"old", now() - Duration::days(2))
            .await
            .unwrap();
        let newest = db.insert_feed_record("u", b"newest", now()).await.unwrap();
        let middle = db
            .insert_feed_record("u", b"middle", now() - Duration::days(1))
            .await
            .unwrap();

        let ids: Vec<i64> = db
            .list_feed_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![newest, middle, old]);

        let summaries = db.list_feed_record_summaries().await.unwrap();
        assert_eq!(
            summaries.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![newest, middle, old]
        );
        assert_eq!(summaries[0].size_bytes, 6);
    }

    #[tokio::test]
    async fn test_delete_reports_whether_row_existed() {
        let db = Database::in_memory().await.unwrap();
        let id = db.insert_feed_record("u", b"x", now()).await.unwrap();
        assert!(db.delete_feed_record(id).await.unwrap());
        assert!(!db.delete_feed_record(id).await.unwrap());
        assert!(db.get_feed_record(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retention_prunes_only_expired_records() {
        let db = Database::in_memory().await.unwrap();
        let t = now();
        db.insert_feed_record("u", b"ten days", t - Duration::days(10))
            .await
            .unwrap();
        let three_days = db
            .insert_feed_record("u", b"three days", t - Duration::days(3))
            .await
            .unwrap();
        let one_hour = db
            .insert_feed_record("u", b"one hour", t - Duration::hours(1))
            .await
            .unwrap();

        let cutoff = retention::cutoff(t, RetentionWindow::Week);
        assert_eq!(cutoff, t - Duration::days(7));

        assert_eq!(db.delete_feed_records_older_than(cutoff).await.unwrap(), 1);
        assert_eq!(db.delete_feed_records_older_than(cutoff).await.unwrap(), 0);

        let remaining: Vec<i64> = db
            .list_feed_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(remaining, vec![one_hour, three_days]);
    }

    #[tokio::test]
    async fn test_record_exactly_at_cutoff_is_kept() {
        let db = Database::in_memory().await.unwrap();
        let cutoff = now() - Duration::days(7);
        db.insert_feed_record("u", b"edge", cutoff).await.unwrap();
        assert_eq!(db.delete_feed_records_older_than(cutoff).await.unwrap(), 0);
        assert_eq!(db.count_feed_records().await.unwrap(), 1);
    }
}
