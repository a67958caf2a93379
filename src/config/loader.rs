use std::{env, time::Duration};

use super::env::{ConfigError, FilterConfig, LoggingConfig, SpamConfig, DEFAULT_BAD_DOMAINS_URL};

pub fn load_config() -> Result<FilterConfig, ConfigError> {
    dotenvy::dotenv().ok();
    FilterConfig::from_env()
}

impl FilterConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let data_dir = env::var("MODGUARD_DATA_DIR").unwrap_or_else(|_| "data".to_string());
        let logs_dir = env::var("MODGUARD_LOGS_DIR").unwrap_or_else(|_| "logs".to_string());

        let logging = LoggingConfig {
            level: env::var("MODGUARD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let check_timeout =
            Duration::from_millis(parse_int("MODGUARD_CHECK_TIMEOUT_MS").unwrap_or(5_000));

        let repeat_count = parse_int("MODGUARD_SPAM_REPEAT_COUNT").unwrap_or(2) as usize;
        if repeat_count == 0 {
            return Err(ConfigError::Invalid("MODGUARD_SPAM_REPEAT_COUNT"));
        }
        let spam = SpamConfig {
            interval_secs: parse_int("MODGUARD_SPAM_INTERVAL_SEC").unwrap_or(15),
            repeat_count,
        };

        let bad_domains_url = env::var("MODGUARD_BAD_DOMAINS_URL")
            .unwrap_or_else(|_| DEFAULT_BAD_DOMAINS_URL.to_string());

        let refresh_interval = Duration::from_secs(
            parse_int("MODGUARD_REFRESH_INTERVAL_SEC").unwrap_or(2 * 60 * 60),
        );

        Ok(Self {
            data_dir,
            logs_dir,
            logging,
            check_timeout,
            spam,
            bad_domains_url,
            refresh_interval,
        })
    }
}

fn parse_int(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|value| value.parse::<u64>().ok())
}
