//! Runtime configuration, loaded from TOML.
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory of the sled database.
    pub db_path: PathBuf,
    /// How many times a contended report lock is retried before giving up.
    pub lock_attempts: u32,
    pub lock_backoff_ms: u64,
    /// Minimum length of a report's accomplished tasks.
    pub min_task_chars: usize,
    pub max_attachment_bytes: u64,
    /// Send a notification to the other party when a report changes status.
    pub notify_on_transition: bool,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("weekly-report.db"),
            lock_attempts: 50,
            lock_backoff_ms: 2,
            min_task_chars: 10,
            max_attachment_bytes: 10 * 1024 * 1024,
            notify_on_transition: true,
            log_filter: "info".into(),
        }
    }
}

impl Config {
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("invalid configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read configuration {}", path.display()))?;
        Self::from_toml_str(&contents)
    }
}
