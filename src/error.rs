//! Error types for gemini-guard.

use std::path::PathBuf;

use thiserror::Error;

/// Gate error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Not a git repository (no .git found in {})", .0.display())]
    NotARepository(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Invalid verdict: {reason}")]
    InvalidVerdict { reason: String, raw: String },

    #[error("Audit write failed: {0}")]
    AuditWrite(#[source] rusqlite::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Error::Inference(msg.into())
    }
}
