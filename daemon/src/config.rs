use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Daemon configuration, deserialized from a TOML file.
///
/// ```toml
/// app_id = "123456789012345678"
/// app_list_path = "apps.json"
/// plugins = ["greeter"]
/// poll_interval_secs = 1
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Application identifier registered with the presence endpoint.
    pub app_id: String,
    /// Path to the JSON application database.
    pub app_list_path: PathBuf,
    /// Plugins to load at startup, in order.
    #[serde(default)]
    pub plugins: Vec<String>,
    /// Seconds between watcher polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Config {
    /// Loads and validates the config. A missing file, malformed TOML, or an
    /// empty required field is fatal at startup.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;

        if config.app_id.is_empty() {
            bail!("config field app_id must not be empty");
        }
        if config.app_list_path.as_os_str().is_empty() {
            bail!("config field app_list_path must not be empty");
        }
        Ok(config)
    }

    /// Poll interval as a duration, never below one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
