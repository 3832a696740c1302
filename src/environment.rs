use clap::Args;
use tokio::time::Duration;

use crate::rss::REQUEST_TIMEOUT;

/// Process-level settings, taken from flags or the environment.
#[derive(Debug, Clone, Args)]
pub struct ServiceConfig {
    /// SQLite database file; created if missing
    #[clap(long, env = "DATABASE_PATH", default_value = "feed_monitor.db")]
    pub database_path: String,

    /// Address the admin API binds to
    #[clap(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Port the admin API listens on
    #[clap(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Upper bound for a single feed request, in seconds
    #[clap(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = REQUEST_TIMEOUT.as_secs())]
    pub request_timeout_secs: u64,

    /// Directory for the rolling log files
    #[clap(long, env = "LOG_DIR", default_value = "logs")]
    pub log_dir: String,
}

impl ServiceConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Version line including build metadata injected by `build.rs`.
pub fn build_info() -> String {
    format!(
        "{} {} (git {}, built {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_HASH").filter(|h| !h.is_empty()).unwrap_or("unknown"),
        option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[clap(flatten)]
        service: ServiceConfig,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::parse_from([
            "feed_monitor",
            "--bind-address",
            "127.0.0.1",
            "--port",
            "9000",
            "--request-timeout-secs",
            "0",
        ]);
        assert_eq!(cli.service.listen_addr(), "127.0.0.1:9000");
        // A zero timeout would fail every request; it is clamped to one second.
        assert_eq!(cli.service.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_request_timeout_defaults_to_fetcher_timeout() {
        let cli = TestCli::parse_from(["feed_monitor", "--port", "8080"]);
        if std::env::var_os("REQUEST_TIMEOUT_SECS").is_none() {
            assert_eq!(cli.service.request_timeout(), REQUEST_TIMEOUT);
        }
    }

    #[test]
    fn test_build_info_names_the_package() {
        assert!(build_info().starts_with("feed_monitor "));
    }
}
