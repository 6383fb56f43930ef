//! Configuration management for gemini-guard.
//!
//! The credential only ever comes from the environment. Everything else can
//! be tuned per project in `.gemini-guard.toml` at the repository root.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Project config file name.
pub const CONFIG_FILE: &str = ".gemini-guard.toml";

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment override for the model name.
pub const MODEL_ENV: &str = "GEMINI_MODEL";

/// Environment override for the audit database path.
pub const DB_ENV: &str = "GEMINI_GUARD_DB";

/// Settings read from `.gemini-guard.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_audit_db")]
    pub audit_db: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            audit_db: default_audit_db(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_audit_db() -> String {
    ".gemini_audit.db".to_string()
}

impl FileConfig {
    /// Load `.gemini-guard.toml` from the project root, or defaults if absent.
    pub fn load(project_root: &Path) -> Result<Self, Error> {
        let path = project_root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: FileConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Audit database location for read-only commands, which need no API key.
pub fn audit_db_path(project_root: &Path) -> Result<PathBuf, Error> {
    let file = FileConfig::load(project_root)?;
    let db = std::env::var(DB_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(file.audit_db);
    Ok(project_root.join(db))
}

/// Validated runtime configuration, built once at startup.
#[derive(Clone)]
pub struct GuardConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
    pub audit_db: PathBuf,
}

impl fmt::Debug for GuardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("audit_db", &self.audit_db)
            .finish()
    }
}

impl GuardConfig {
    /// Load config for the repository at `project_root` from file and process env.
    pub fn load(project_root: &Path) -> Result<Self, Error> {
        let file = FileConfig::load(project_root)?;
        Self::resolve(project_root, file, |key| std::env::var(key).ok())
    }

    /// Merge file settings with environment lookups and validate the result.
    pub fn resolve<F>(project_root: &Path, file: FileConfig, env: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = env(API_KEY_ENV)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::config(format!("{} environment variable not found", API_KEY_ENV)))?;

        let model = env(MODEL_ENV)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(file.model);
        let audit_db = env(DB_ENV)
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(file.audit_db);

        let config = Self {
            api_key,
            model: model.trim().to_string(),
            endpoint: file.endpoint,
            timeout: Duration::from_secs(file.timeout_secs),
            audit_db: project_root.join(audit_db),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.model.is_empty() {
            return Err(Error::config("model must not be empty"));
        }
        if self.timeout.is_zero() {
            return Err(Error::config("timeout_secs must be greater than zero"));
        }
        Url::parse(&self.endpoint)
            .map_err(|e| Error::config(format!("invalid endpoint {}: {}", self.endpoint, e)))?;
        Ok(())
    }
}
