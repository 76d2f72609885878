/*
[INPUT]:  YAML configuration file and TASKDECK_* environment variables
[OUTPUT]: Validated application configuration
[POS]:    Configuration layer - backend endpoint, task table and session settings
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use taskdeck_adapter::{ClientConfig, RealtimeConfig};

use crate::tasks::TaskSettings;

pub const ENV_URL: &str = "TASKDECK_URL";
pub const ENV_API_KEY: &str = "TASKDECK_API_KEY";

/// Top-level configuration for the to-do client
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Hosted backend endpoint and credentials
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://project.supabase.co`
    #[serde(default)]
    pub url: String,
    /// Public (anon) API key
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Task table, attachment bucket and live feed settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TasksConfig {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Subscribe to the live change feed
    #[serde(default = "default_true")]
    pub realtime: bool,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            bucket: default_bucket(),
            realtime: true,
        }
    }
}

/// Session persistence
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_true")]
    pub persist: bool,
    /// Defaults to `<data_dir>/taskdeck/session.json`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persist: true,
            path: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_table() -> String {
    "tasks".to_string()
}

fn default_bucket() -> String {
    "tasks-images".to_string()
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load the optional file, apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let path_str = path.to_str().context("config path must be valid utf-8")?;
                Self::from_file(path_str).with_context(|| format!("read config {path_str}"))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Non-empty values from `lookup` replace the file's URL and key
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_URL).filter(|value| !value.trim().is_empty()) {
            self.backend.url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|value| !value.trim().is_empty()) {
            self.backend.api_key = key;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backend.url.trim().is_empty() {
            bail!("backend URL is required (backend.url or {ENV_URL})");
        }
        if self.backend.api_key.trim().is_empty() {
            bail!("backend API key is required (backend.api_key or {ENV_API_KEY})");
        }
        if self.tasks.table.trim().is_empty() {
            bail!("tasks.table must not be empty");
        }
        if self.tasks.bucket.trim().is_empty() {
            bail!("tasks.bucket must not be empty");
        }
        if self.backend.timeout_secs == 0 || self.backend.connect_timeout_secs == 0 {
            bail!("backend timeouts must be positive");
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.backend.timeout_secs),
            connect_timeout: Duration::from_secs(self.backend.connect_timeout_secs),
        }
    }

    pub fn realtime_config(&self) -> RealtimeConfig {
        RealtimeConfig::default()
    }

    pub fn task_settings(&self) -> TaskSettings {
        TaskSettings {
            table: self.tasks.table.clone(),
            bucket: self.tasks.bucket.clone(),
        }
    }

    /// Where the session is stored, or `None` when persistence is off
    pub fn session_path(&self) -> Option<PathBuf> {
        if !self.session.persist {
            return None;
        }
        self.session.path.clone().or_else(default_session_path)
    }
}

fn default_session_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("taskdeck").join("session.json"))
}
