pub mod env;
mod loader;

pub use env::{ConfigError, FilterConfig, LoggingConfig, SpamConfig, DEFAULT_BAD_DOMAINS_URL};
pub use loader::load_config;
