//! The feed monitor service: owns the settings, the record store and the
//! scheduler, and implements the settings-update and admin-action flows.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::app::AdminQuery;
use crate::clock::Clock;
use crate::config::{ConfigCandidate, ConfigChanges, ConfigStore, FeedConfig};
use crate::db::{Database, FeedRecordSummary};
use crate::rss::FeedFetcher;
use crate::scheduler::{FeedFetchJob, SchedulePhase, Scheduler, TickOutcome};
use crate::TARGET_SCHEDULER;

pub const NOT_SCHEDULED: &str = "Not scheduled";
pub const ADD_FEED_NOTICE: &str = "Add a feed to start monitoring.";

/// Result of a settings update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub config: FeedConfig,
    pub changes: ConfigChanges,
    /// Outcome of the out-of-band fetch triggered by a new URL, if any.
    pub immediate_fetch: Option<TickOutcome>,
    pub rescheduled: bool,
}

/// Snapshot rendered by the admin status page.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub config: FeedConfig,
    pub schedule_phase: SchedulePhase,
    pub period_secs: u64,
    pub next_run_at: Option<DateTime<Utc>>,
    /// `next_run_at` as `YYYY-MM-DD HH:MM:SS`, or "Not scheduled".
    pub next_fetch: String,
    pub notice: Option<String>,
    pub records: Vec<FeedRecordSummary>,
}

/// What the admin page should answer to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminResponse {
    /// Serve a stored payload as XML, as an attachment when downloading.
    Feed {
        record_id: i64,
        payload: Vec<u8>,
        attachment: bool,
    },
    /// Send the browser back to the admin page.
    Redirect,
    /// Render the normal status page.
    Page,
}

pub struct FeedMonitor {
    db: Database,
    config: ConfigStore,
    scheduler: Scheduler,
    // Held across store write, immediate fetch and reschedule.
    settings_lock: Mutex<()>,
}

impl FeedMonitor {
    pub fn new(db: Database, fetcher: Arc<dyn FeedFetcher>, clock: Arc<dyn Clock>) -> Self {
        let config = ConfigStore::new(db.clone());
        let job = FeedFetchJob::new(db.clone(), config.clone(), fetcher, Arc::clone(&clock));
        let scheduler = Scheduler::new(
            job,
            clock,
            FeedConfig::default().fetch_interval.period(),
        );
        Self {
            db,
            config,
            scheduler,
            settings_lock: Mutex::new(()),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Stores default settings if none exist and arms the schedule with the
    /// configured interval.
    pub async fn activate(&self) -> Result<FeedConfig, sqlx::Error> {
        self.config.ensure_defaults().await?;
        let config = self.config.get().await?;
        self.scheduler.start(config.fetch_interval.period());
        info!(
            target: TARGET_SCHEDULER,
            "Feed monitor activated (feed={:?}, interval={})", config.feed_url, config.fetch_interval
        );
        Ok(config)
    }

    pub fn deactivate(&self) {
        self.scheduler.stop();
        info!(target: TARGET_SCHEDULER, "Feed monitor deactivated");
    }

    /// Validates and stores new settings, then reacts to what changed: a new
    /// non-empty URL is fetched right away, and a new URL or interval
    /// replaces the pending schedule.
    ///
    /// Concurrent updates run one after another, so the schedule always ends
    /// up on the interval of the last stored settings.
    #[instrument(target = "scheduler", level = "info", skip(self))]
    pub async fn update_settings(
        &self,
        candidate: &ConfigCandidate,
    ) -> Result<SettingsUpdate, sqlx::Error> {
        let _guard = self.settings_lock.lock().await;
        let (config, changes) = self.config.set(candidate).await?;

        let immediate_fetch = if changes.url_changed && config.has_feed() {
            Some(self.scheduler.run_once_now().await)
        } else {
            None
        };

        let rescheduled = changes.needs_reschedule();
        if rescheduled {
            self.scheduler.reconfigure(config.fetch_interval.period());
        }

        Ok(SettingsUpdate {
            config,
            changes,
            immediate_fetch,
            rescheduled,
        })
    }

    pub async fn run_once_now(&self) -> TickOutcome {
        self.scheduler.run_once_now().await
    }

    pub async fn status(&self) -> Result<MonitorStatus, sqlx::Error> {
        let config = self.config.get().await?;
        let schedule = self.scheduler.state();
        let records = self.db.list_feed_record_summaries().await?;

        let next_fetch = schedule
            .next_run_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| NOT_SCHEDULED.to_string());
        let notice = (!config.has_feed()).then(|| ADD_FEED_NOTICE.to_string());

        Ok(MonitorStatus {
            config,
            schedule_phase: schedule.phase,
            period_secs: schedule.period.as_secs(),
            next_run_at: schedule.next_run_at,
            next_fetch,
            notice,
            records,
        })
    }

    /// Resolves the download/view/delete query parameters of the admin page.
    ///
    /// Download wins over view. A missing record falls through to the
    /// delete check and then to the normal page.
    pub async fn handle_admin_query(
        &self,
        query: &AdminQuery,
    ) -> Result<AdminResponse, sqlx::Error> {
        if let Some(id) = query.download_feed_id.or(query.view_feed_id) {
            if let Some(record) = self.db.get_feed_record(id).await? {
                return Ok(AdminResponse::Feed {
                    record_id: record.id,
                    payload: record.feed_data,
                    attachment: query.download_feed_id.is_some(),
                });
            }
        }

        if let Some(id) = query.delete_feed_id {
            self.db.delete_feed_record(id).await?;
            return Ok(AdminResponse::Redirect);
        }

        Ok(AdminResponse::Page)
    }
}
