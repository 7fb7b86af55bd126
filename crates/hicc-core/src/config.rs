//! Configuration types.
//!
//! Configuration lives in `hicc.toml` under the platform config directory
//! (`~/.config/hicc/hicc.toml` on Linux). Every field has a default, so a
//! missing file or a partial one is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::store::DEFAULT_EXPOSED;

/// Polling faster than this only burns cycles and invites overlapping reloads.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Full dashboard configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardConfig {
    #[serde(default)]
    pub manager: ManagerConfig,

    #[serde(default)]
    pub sync: SyncConfig,
}

/// Request manager settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ManagerConfig {
    /// Base URL of the search backend, including the trailing slash.
    pub solr_url: String,

    /// Servlet requested when a cycle does not name one.
    pub servlet: String,

    /// If set, requests are POSTed here as a single `query` field.
    pub proxy_url: Option<String>,

    /// Request timeout in milliseconds.
    pub timeout_ms: u64,

    pub request_policy: RequestPolicy,

    pub response_policy: ResponsePolicy,
}

impl ManagerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            solr_url: "http://localhost:8983/solr/".to_string(),
            servlet: "select".to_string(),
            proxy_url: None,
            timeout_ms: 30_000,
            request_policy: RequestPolicy::default(),
            response_policy: ResponsePolicy::default(),
        }
    }
}

/// What to do when a request is started while another one is in flight.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestPolicy {
    /// Let both run; every store mutation produces its own request.
    #[default]
    Overlap,
    /// Drop the new request.
    SkipInFlight,
}

/// What to do with a response that arrives after a newer request started.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePolicy {
    /// Whatever arrives last becomes the current response.
    #[default]
    LastWriteWins,
    /// Ignore responses older than the current one.
    DiscardStale,
}

/// External state persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub mode: SyncMode,

    /// Polling interval in milliseconds when the host has no change events.
    pub interval_ms: u64,

    /// Parameter names persisted in the URL.
    pub exposed: Vec<String>,
}

impl SyncConfig {
    /// The polling interval, clamped to [`MIN_POLL_INTERVAL`].
    pub fn interval(&self) -> Duration {
        let interval = Duration::from_millis(self.interval_ms);
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                "Sync interval {:?} below minimum, using {:?}",
                interval,
                MIN_POLL_INTERVAL
            );
            return MIN_POLL_INTERVAL;
        }
        interval
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            interval_ms: 250,
            exposed: DEFAULT_EXPOSED.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Where exposed parameters are persisted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// The URL fragment.
    #[default]
    Hash,
    /// Navigation state objects plus a mirrored query string.
    History,
    /// Not persisted.
    None,
}

/// Get the config directory path.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("hicc"))
}

/// Get the path to hicc.toml.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("hicc.toml"))
}

/// Load the configuration from the default location.
///
/// A missing file yields the defaults.
pub fn load_config() -> Result<DashboardConfig, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    load_config_from(&path)
}

/// Load the configuration from an explicit path.
///
/// A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<DashboardConfig, ConfigError> {
    if !path.exists() {
        tracing::info!("No config at {}, using defaults", path.display());
        return Ok(DashboardConfig::default());
    }

    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
    let config: DashboardConfig =
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;

    if config.manager.servlet.is_empty() {
        return Err(ConfigError::Invalid("manager.servlet is empty".to_string()));
    }
    if config.manager.timeout_ms == 0 {
        return Err(ConfigError::Invalid("manager.timeout_ms must be positive".to_string()));
    }
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("hicc.toml")).unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.sync.interval(), Duration::from_millis(250));
        assert_eq!(config.sync.exposed, ["fq", "q", "start"]);
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[manager]
solr_url = "http://search:8983/solr/logs/"
response_policy = "discard_stale"

[sync]
mode = "history"
interval_ms = 1
"#
        )
        .unwrap();

        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.manager.solr_url, "http://search:8983/solr/logs/");
        assert_eq!(config.manager.servlet, "select");
        assert_eq!(config.manager.response_policy, ResponsePolicy::DiscardStale);
        assert_eq!(config.manager.request_policy, RequestPolicy::Overlap);
        assert_eq!(config.sync.mode, SyncMode::History);
        assert_eq!(config.sync.interval(), MIN_POLL_INTERVAL);
    }

    #[test]
    fn test_invalid_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sync]\nmode = \"carrier-pigeon\"").unwrap();
        assert!(matches!(
            load_config_from(file.path()),
            Err(ConfigError::Parse(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[manager]\nservlet = \"\"").unwrap();
        assert!(matches!(
            load_config_from(file.path()),
            Err(ConfigError::Invalid(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[manager]\ntimeout_ms = 0").unwrap();
        assert!(matches!(
            load_config_from(file.path()),
            Err(ConfigError::Invalid(msg)) if msg.contains("timeout_ms")
        ));
    }
}
