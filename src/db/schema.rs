//! Audit log schema.

use rusqlite::{Connection, Result, Row};

use crate::error::Error;
use crate::verdict::{Status, Verdict};

/// Create the audit table if it does not exist yet.
pub fn init_db(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS logs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp   TEXT,
            status      TEXT,
            message     TEXT,
            diff        TEXT,
            context     TEXT,
            ai_response TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_logs_status ON logs(status);
        "#,
    )?;
    Ok(())
}

/// A gate decision about to be written.
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub status: Status,
    pub message: String,
    pub diff: String,
    pub context: String,
    /// Serialized verdict, stored verbatim.
    pub ai_response: String,
}

impl NewAuditRecord {
    /// Record for a verdict reached over `diff` and `context`.
    pub fn from_verdict(verdict: &Verdict, diff: &str, context: &str) -> Self {
        Self {
            status: verdict.status,
            message: verdict.message.clone(),
            diff: diff.to_string(),
            context: context.to_string(),
            ai_response: verdict.to_json(),
        }
    }
}

/// Stored audit row.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: String,
    pub status: String,
    pub message: String,
    pub diff: String,
    pub context: String,
    pub ai_response: String,
}

impl AuditRecord {
    pub fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            timestamp: row.get::<_, Option<String>>("timestamp")?.unwrap_or_default(),
            status: row.get::<_, Option<String>>("status")?.unwrap_or_default(),
            message: row.get::<_, Option<String>>("message")?.unwrap_or_default(),
            diff: row.get::<_, Option<String>>("diff")?.unwrap_or_default(),
            context: row.get::<_, Option<String>>("context")?.unwrap_or_default(),
            ai_response: row
                .get::<_, Option<String>>("ai_response")?
                .unwrap_or_default(),
        })
    }

    /// Decode the stored payload back into a verdict.
    pub fn verdict(&self) -> Result<Verdict, Error> {
        Ok(serde_json::from_str(&self.ai_response)?)
    }
}
