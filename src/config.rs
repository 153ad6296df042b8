use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE: &str = "sentinel_config.yml";
const DEFAULT_REQUEST_TIMEOUT: u64 = 60;

/// How the seen-set is carried from one run to the next.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeenMode {
    /// The next run compares against exactly this run's fetch.
    #[default]
    Overwrite,
    /// The next run compares against everything seen so far.
    Cumulative,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentinel_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_dir: Option<PathBuf>,
    #[serde(default)]
    pub seen_mode: SeenMode,
    /// Seconds before a request to the archive is abandoned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err_prefix: Option<String>,
}

impl Config {
    /// Reads the YAML configuration. A missing or empty file yields the defaults.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing configuration {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml_ng::from_str(content)?;
        Ok(config)
    }

    pub fn local_dir(&self) -> PathBuf {
        self.local_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
    }
}
