//! Runtime settings.
//!
//! Every field has a default matching the public Numerai Signals bucket and
//! the `db/` + `data/` folder layout, so running without a config file works.
//! A TOML file can override any subset of fields. The EODHD token is never
//! read from or written to TOML; it comes from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the EODHD API token.
pub const EODHD_TOKEN_ENV: &str = "NUMERAI_EODHD_TOKEN";

/// Token used when the environment variable is unset. Requests made with it fail.
pub const PLACEHOLDER_TOKEN: &str = "your_eodhd_api_key";

const AWS_BASE_URL: &str = "https://numerai-signals-public-data.s3-us-west-2.amazonaws.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Historical universe CSV (URL or path).
    pub historical_universe_url: String,
    /// Live universe CSV (URL or path).
    pub live_universe_url: String,
    /// Canonical ↔ Yahoo ticker map CSV (URL or path).
    pub alias_url: String,
    pub override_file: PathBuf,
    pub map_file: PathBuf,
    pub quote_folder: PathBuf,
    /// Status ledger file name, created inside `quote_folder`.
    pub status_file_name: String,
    pub eodhd_base_url: String,
    pub yahoo_base_url: String,
    /// Attempts per ticker, including the first.
    pub retry_count: u32,
    pub retry_wait_secs: u64,
    pub max_workers: usize,
    pub request_timeout_secs: u64,
    #[serde(skip)]
    pub eodhd_token: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            historical_universe_url: format!("{AWS_BASE_URL}/signals_train_val_bbg.csv"),
            live_universe_url: format!("{AWS_BASE_URL}/latest_universe.csv"),
            alias_url: format!("{AWS_BASE_URL}/signals_ticker_map_w_bbg.csv"),
            override_file: PathBuf::from("db/eodhd-overrides.csv"),
            map_file: PathBuf::from("db/eodhd-map.csv"),
            quote_folder: PathBuf::from("data/ticker_bin"),
            status_file_name: "download_status.csv".into(),
            eodhd_base_url: "https://eodhistoricaldata.com".into(),
            yahoo_base_url: "https://query1.finance.yahoo.com".into(),
            retry_count: 3,
            retry_wait_secs: 25,
            max_workers: 10,
            request_timeout_secs: 30,
            eodhd_token: PLACEHOLDER_TOKEN.into(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file; unspecified fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Replace the token with `$NUMERAI_EODHD_TOKEN` when it is set.
    pub fn with_token_from_env(self) -> Self {
        match std::env::var(EODHD_TOKEN_ENV) {
            Ok(token) if !token.is_empty() => self.with_token(token),
            _ => self,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.eodhd_token = token.into();
        self
    }

    pub fn has_placeholder_token(&self) -> bool {
        self.eodhd_token == PLACEHOLDER_TOKEN
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_count == 0 {
            return Err(ConfigError::Invalid("retry_count must be at least 1".into()));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid("max_workers must be at least 1".into()));
        }
        if self.status_file_name.trim().is_empty() {
            return Err(ConfigError::Invalid("status_file_name is empty".into()));
        }
        Ok(())
    }

    pub fn status_file(&self) -> PathBuf {
        self.quote_folder.join(&self.status_file_name)
    }

    pub fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.retry_wait_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
