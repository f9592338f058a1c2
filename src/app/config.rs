//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file with an environment variable
//! override for the sensitive `TELEGRAM_BOT_TOKEN` value.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

use crate::adapter::dexscreener::DEFAULT_API_URL;
use crate::app::scanner::ScannerConfig;
use crate::error::{ConfigError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub quotes: QuotesConfig,
    #[serde(default)]
    pub scanner: ScannerAppConfig,
    #[serde(default)]
    pub telegram: TelegramAppConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// SQLite database location.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    "capwatch.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Market-cap quote source configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotesConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Scan cadences.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerAppConfig {
    /// How often to sweep watches awaiting their announcement, in seconds.
    #[serde(default = "default_new_watch_interval_secs")]
    pub new_watch_interval_secs: u64,
    /// How often to sweep the whole watchlist, in seconds.
    #[serde(default = "default_full_sweep_interval_secs")]
    pub full_sweep_interval_secs: u64,
    /// Pause between tokens within a sweep, in milliseconds.
    #[serde(default = "default_pacing_millis")]
    pub pacing_millis: u64,
}

const fn default_new_watch_interval_secs() -> u64 {
    120
}

const fn default_full_sweep_interval_secs() -> u64 {
    1800
}

const fn default_pacing_millis() -> u64 {
    1000
}

impl Default for ScannerAppConfig {
    fn default() -> Self {
        Self {
            new_watch_interval_secs: default_new_watch_interval_secs(),
            full_sweep_interval_secs: default_full_sweep_interval_secs(),
            pacing_millis: default_pacing_millis(),
        }
    }
}

impl From<&ScannerAppConfig> for ScannerConfig {
    fn from(config: &ScannerAppConfig) -> Self {
        Self {
            new_watch_interval: Duration::from_secs(config.new_watch_interval_secs),
            full_sweep_interval: Duration::from_secs(config.full_sweep_interval_secs),
            pacing: Duration::from_millis(config.pacing_millis),
        }
    }
}

/// Telegram surface configuration.
/// The bot token is loaded from the `TELEGRAM_BOT_TOKEN` env var at runtime
/// (never from the config file).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramAppConfig {
    /// Enable the Telegram notifier and command surface.
    #[serde(default)]
    pub enabled: bool,
    /// Target chat for notifications.
    #[serde(default)]
    pub chat_id: i64,
    /// The single Telegram user allowed to run commands.
    #[serde(default)]
    pub allowed_user_id: u64,
    /// Bot token loaded from `TELEGRAM_BOT_TOKEN` env var at runtime
    #[serde(skip)]
    pub bot_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;

        let mut config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;

        // Load bot token from environment variable (never from config file for security)
        config.telegram.bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok();

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.database.path.is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.path",
            }
            .into());
        }
        if self.quotes.api_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "quotes.api_url",
            }
            .into());
        }
        if self.scanner.new_watch_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanner.new_watch_interval_secs",
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }
        if self.scanner.full_sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanner.full_sweep_interval_secs",
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }
        if self.telegram.enabled {
            if self.telegram.bot_token.as_deref().unwrap_or("").is_empty() {
                return Err(ConfigError::MissingField {
                    field: "TELEGRAM_BOT_TOKEN",
                }
                .into());
            }
            if self.telegram.chat_id == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "telegram.chat_id",
                    reason: "must be set when telegram is enabled".to_string(),
                }
                .into());
            }
            if self.telegram.allowed_user_id == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "telegram.allowed_user_id",
                    reason: "must be set when telegram is enabled".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}
