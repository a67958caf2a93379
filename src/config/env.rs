use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BAD_DOMAINS_URL: &str =
    "https://cdn.discordapp.com/bad-domains/updated_hashes.json";

/// Engine configuration, constructed once at startup and passed by
/// reference into the checkers.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub data_dir: String,
    pub logs_dir: String,
    pub logging: LoggingConfig,
    /// Per-checker evaluation deadline.
    pub check_timeout: Duration,
    pub spam: SpamConfig,
    pub bad_domains_url: String,
    /// Cadence of the periodic external-list refresh.
    pub refresh_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone)]
pub struct SpamConfig {
    /// Sliding-window length for repeated-content detection.
    pub interval_secs: u64,
    /// Occurrences within the window required to declare spam.
    pub repeat_count: usize,
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            repeat_count: 2,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            logs_dir: "logs".to_string(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            check_timeout: Duration::from_secs(5),
            spam: SpamConfig::default(),
            bad_domains_url: DEFAULT_BAD_DOMAINS_URL.to_string(),
            refresh_interval: Duration::from_secs(2 * 60 * 60),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {0}")]
    Invalid(&'static str),
}
