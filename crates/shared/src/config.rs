//! Configuration management for the anime catalog.
//!
//! Configuration is loaded from a TOML file with defaults for every setting,
//! then overridden from the environment (a `.env` file is honoured).

use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the catalog database location
pub const DATABASE_URL_ENV: &str = "ANIME_CATALOG_DATABASE_URL";

/// Environment variable overriding the catalog API base URL
pub const BASE_URL_ENV: &str = "ANIME_CATALOG_BASE_URL";

/// Slowest accepted request rate: one request per hour
pub const MIN_REQUESTS_PER_SECOND: f64 = 1.0 / 3600.0;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Remote catalog settings
    pub catalog: CatalogConfig,

    /// Import settings
    #[serde(default)]
    pub import: ImportConfig,

    /// File the configuration was read from, `None` for built-in defaults
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database location, `sqlite://path` or a bare path (relative to the
    /// data directory or absolute). Required.
    #[serde(default)]
    pub url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Remote catalog API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog API base URL
    pub base_url: String,

    /// HTTP client timeout in seconds
    pub request_timeout_secs: u64,

    /// Request rate limiting settings
    pub rate_limit: RateLimitConfig,

    /// Retry policy for HTTP 429 responses
    pub retry: RetryConfig,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per second (0 disables spacing)
    pub requests_per_second: f64,

    /// Maximum requests per minute (0 disables the window)
    pub requests_per_minute: u32,
}

/// Backoff shape between rate-limited attempts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// Retry configuration for rate-limited requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Maximum retries after the first attempt (absent = retry forever)
    pub max_retries: Option<u32>,

    /// Delay before the first retry in milliseconds
    pub base_delay_ms: u64,

    /// Upper bound for a single delay in milliseconds
    pub max_delay_ms: u64,

    /// Timeout for each attempt in milliseconds (absent = no timeout)
    pub per_call_timeout_ms: Option<u64>,

    /// Backoff shape
    pub backoff: BackoffKind,

    /// Randomize each delay between zero and its computed value
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: Some(5),
            base_delay_ms: 2000,
            max_delay_ms: 30_000,
            per_call_timeout_ms: Some(30_000),
            backoff: BackoffKind::Exponential,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Fixed two-second delay, retried until the server stops throttling
    pub fn legacy() -> Self {
        Self {
            max_retries: None,
            base_delay_ms: 2000,
            max_delay_ms: 2000,
            per_call_timeout_ms: None,
            backoff: BackoffKind::Fixed,
            jitter: false,
        }
    }
}

/// Import pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Number of anime imported when no limit is given
    pub default_limit: usize,

    /// Pause after each processed episode in milliseconds
    pub episode_delay_ms: u64,

    /// Pause after each processed video server in milliseconds
    pub server_delay_ms: u64,

    /// Pause between anime entries in milliseconds
    pub anime_delay_ms: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            episode_delay_ms: 1000,
            server_delay_ms: 500,
            anime_delay_ms: 2000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root_dir: "data".to_string(),
            },
            database: DatabaseConfig::default(),
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: true,
                json_format: false,
            },
            catalog: CatalogConfig {
                base_url: "https://animeh.lopyubibil.site".to_string(),
                request_timeout_secs: 30,
                rate_limit: RateLimitConfig {
                    requests_per_second: 2.0,
                    requests_per_minute: 60,
                },
                retry: RetryConfig::default(),
            },
            import: ImportConfig::default(),
            loaded_from: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration with
    /// `loaded_from` unset. Nothing is logged here since this runs before
    /// logging is initialized.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.loaded_from = Some(path.to_path_buf());

        Ok(config)
    }

    /// Load the file, then apply `.env` and process environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        // A missing .env file is not an error
        let _ = dotenvy::dotenv();

        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(DATABASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.database.url = Some(url);
        }
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.catalog.base_url = base_url;
        }
    }

    /// Check settings that have no usable default or are out of range
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.database_path()?;

        let rps = self.catalog.rate_limit.requests_per_second;
        if !rps.is_finite() || rps < 0.0 || (rps > 0.0 && rps < MIN_REQUESTS_PER_SECOND) {
            return Err(ConfigError::InvalidRateLimit(format!(
                "requests_per_second must be 0 or at least {MIN_REQUESTS_PER_SECOND}, got {rps}"
            )));
        }

        Ok(())
    }

    /// Get the absolute path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Resolve the database URL to a file path
    pub fn database_path(&self) -> std::result::Result<PathBuf, ConfigError> {
        let url = self
            .database
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let location = match url.split_once("://") {
            Some(("sqlite", rest)) if !rest.is_empty() => rest,
            Some(_) => return Err(ConfigError::InvalidDatabaseUrl(url.to_string())),
            None => url,
        };

        let db_path = Path::new(location);
        if db_path.is_absolute() {
            Ok(db_path.to_path_buf())
        } else {
            Ok(self.data_dir().join(db_path))
        }
    }

    /// Get the absolute path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        let log_path = Path::new(&self.logging.log_dir);
        if log_path.is_absolute() {
            log_path.to_path_buf()
        } else {
            self.data_dir().join(log_path)
        }
    }
}
