//! Verdict decoding.
//!
//! The model is asked for a JSON object with exactly `status`, `message`
//! and `details`. Decoding is strict: unknown or missing fields and any
//! status other than PASS/FAIL are rejected.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Leading fence: triple backticks plus an optional language tag.
static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*").unwrap());

/// Gate decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" => Ok(Status::Pass),
            "FAIL" => Ok(Status::Fail),
            other => Err(Error::config(format!(
                "unknown status '{}', expected PASS or FAIL",
                other
            ))),
        }
    }
}

/// Structured verdict returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Verdict {
    pub status: Status,
    pub message: String,
    pub details: Vec<String>,
}

impl Verdict {
    /// A FAIL verdict with no details.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == Status::Pass
    }

    /// Serialize for storage or as a synthetic model response.
    pub fn to_json(&self) -> String {
        // A struct of strings cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Remove one leading and one trailing code fence, if present.
///
/// Only a single marker is stripped at each end. A language tag is dropped
/// along with the opening fence.
pub fn strip_fences(raw: &str) -> &str {
    let text = raw.trim();
    let text = match OPENING_FENCE.find(text) {
        Some(m) => text[m.end()..].trim(),
        None => text,
    };
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Decode raw model output into a [`Verdict`].
pub fn parse(raw: &str) -> Result<Verdict, Error> {
    let cleaned = strip_fences(raw);
    serde_json::from_str::<Verdict>(cleaned).map_err(|e| Error::InvalidVerdict {
        reason: e.to_string(),
        raw: raw.to_string(),
    })
}
