use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prettytable::{Cell, Row as PrettyRow, Table};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use feed_monitor::app::app_api_loop;
use feed_monitor::clock::SystemClock;
use feed_monitor::db::Database;
use feed_monitor::environment::{build_info, ServiceConfig};
use feed_monitor::logging::configure_logging;
use feed_monitor::rss::HttpFetcher;
use feed_monitor::scheduler::TickOutcome;
use feed_monitor::{ConfigCandidate, FeedMonitor};

#[derive(Parser)]
#[clap(name = "feed_monitor", version, about = "Periodically fetch and archive an RSS feed")]
struct Cli {
    #[clap(flatten)]
    service: ServiceConfig,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler and the admin API (default)
    Serve,

    /// Fetch the configured feed once and exit
    Fetch,

    /// List stored feed snapshots, newest first
    List,

    /// Update feed settings; omitted options keep their current value
    Configure {
        /// Feed URL; an invalid URL clears it
        #[clap(long)]
        feed_url: Option<String>,

        /// hourly, daily or weekly
        #[clap(long)]
        interval: Option<String>,

        /// week, month or year
        #[clap(long)]
        retention: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    configure_logging(&cli.service.log_dir);
    info!("Starting {}", build_info());

    let db = Database::new(&cli.service.database_path)
        .await
        .with_context(|| format!("Failed to open database {}", cli.service.database_path))?;
    let fetcher = HttpFetcher::new(cli.service.request_timeout())?;
    let monitor = Arc::new(FeedMonitor::new(
        db,
        Arc::new(fetcher),
        Arc::new(SystemClock),
    ));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(monitor, &cli.service).await,
        Commands::Fetch => fetch_once(&monitor).await,
        Commands::List => list_records(&monitor).await,
        Commands::Configure {
            feed_url,
            interval,
            retention,
        } => configure(&monitor, feed_url, interval, retention).await,
    }
}

async fn serve(monitor: Arc<FeedMonitor>, service: &ServiceConfig) -> Result<()> {
    let config = monitor.activate().await?;
    monitor.scheduler().spawn_timer();
    if !config.has_feed() {
        info!("No feed URL configured yet; set one via POST /admin/settings or `configure`");
    }

    let shutdown = async {
        if signal::ctrl_c().await.is_err() {
            error!("Failed to listen for ctrl-c");
        }
        info!("Ctrl-C received, shutting down");
    };

    let result = app_api_loop(Arc::clone(&monitor), &service.listen_addr(), shutdown).await;
    monitor.scheduler().shutdown().await;
    result
}

async fn fetch_once(monitor: &FeedMonitor) -> Result<()> {
    monitor.config_store().ensure_defaults().await?;
    match monitor.run_once_now().await {
        TickOutcome::Stored { record_id, pruned } => {
            println!("Stored feed record {} (pruned {} expired)", record_id, pruned);
            Ok(())
        }
        TickOutcome::NoFeedConfigured => {
            println!("No feed URL configured.");
            Ok(())
        }
        TickOutcome::FetchFailed(err) => Err(anyhow::anyhow!("Error fetching feed: {}", err)),
        TickOutcome::StorageFailed(err) => Err(anyhow::anyhow!("Error storing feed: {}", err)),
    }
}

async fn list_records(monitor: &FeedMonitor) -> Result<()> {
    let records = monitor.database().list_feed_record_summaries().await?;
    if records.is_empty() {
        println!("No saved feeds found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(PrettyRow::new(vec![
        Cell::new("ID"),
        Cell::new("Feed URL"),
        Cell::new("Retrieved At"),
        Cell::new("Bytes"),
    ]));
    for record in records {
        table.add_row(PrettyRow::new(vec![
            Cell::new(&record.id.to_string()),
            Cell::new(&record.feed_url),
            Cell::new(&record.retrieved_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::new(&record.size_bytes.to_string()),
        ]));
    }
    table.printstd();
    Ok(())
}

async fn configure(
    monitor: &FeedMonitor,
    feed_url: Option<String>,
    interval: Option<String>,
    retention: Option<String>,
) -> Result<()> {
    let current = monitor.config_store().get().await?;
    let candidate = ConfigCandidate {
        feed_url: feed_url.unwrap_or(current.feed_url),
        fetch_interval: interval.unwrap_or_else(|| current.fetch_interval.to_string()),
        retention_window: retention.unwrap_or_else(|| current.retention_window.to_string()),
    };

    let update = monitor.update_settings(&candidate).await?;
    println!(
        "Feed URL: {}\nInterval: {}\nRetention: {}",
        if update.config.feed_url.is_empty() {
            "(none)"
        } else {
            update.config.feed_url.as_str()
        },
        update.config.fetch_interval,
        update.config.retention_window
    );
    if let Some(outcome) = update.immediate_fetch {
        println!("Immediate fetch: {:?}", outcome);
    }
    Ok(())
}
