use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "offerdesk.toml";

pub const ENV_BASE_URL: &str = "OFFERDESK_BASE_URL";
pub const ENV_EXPORT_DIR: &str = "OFFERDESK_EXPORT_DIR";

const REFRESH_RANGE_MS: std::ops::RangeInclusive<u64> = 500..=60_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Backend root, `/api/...` is appended
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    /// Stats refresh interval in milliseconds
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
    /// How long a toast stays on screen
    #[serde(default = "default_toast_ms")]
    pub toast_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Batch status poll cadence
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up polling after this many attempts
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    /// Keep the finished progress block visible this long
    #[serde(default = "default_progress_linger_ms")]
    pub progress_linger_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file; without one, logs go to stderr only when RUST_LOG is set
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_refresh_ms() -> u64 {
    5_000
}
fn default_toast_ms() -> u64 {
    3_000
}
fn default_poll_interval_ms() -> u64 {
    2_000
}
fn default_max_polls() -> u32 {
    900
}
fn default_progress_linger_ms() -> u64 {
    5_000
}
fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh_ms(),
            toast_ms: default_toast_ms(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: default_max_polls(),
            progress_linger_ms: default_progress_linger_ms(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load from `path`, or from `offerdesk.toml` when it exists, else defaults.
    /// Environment overrides are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.api.base_url = url;
        }
        if let Some(dir) = lookup(ENV_EXPORT_DIR).filter(|v| !v.is_empty()) {
            self.export.dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !REFRESH_RANGE_MS.contains(&self.ui.refresh_ms) {
            return Err(ConfigError::Invalid {
                key: "ui.refresh_ms",
                reason: format!(
                    "{} is outside {}..={}",
                    self.ui.refresh_ms,
                    REFRESH_RANGE_MS.start(),
                    REFRESH_RANGE_MS.end()
                ),
            });
        }
        if self.sync.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "sync.poll_interval_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.sync.max_polls == 0 {
            return Err(ConfigError::Invalid {
                key: "sync.max_polls",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.api.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "api.timeout_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.ui.refresh_ms)
    }

    pub fn toast_ttl(&self) -> Duration {
        Duration::from_millis(self.ui.toast_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.sync.poll_interval_ms)
    }

    pub fn progress_linger(&self) -> Duration {
        Duration::from_millis(self.sync.progress_linger_ms)
    }
}
