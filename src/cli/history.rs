//! Read-only view over the audit log.

use std::fmt::Write as _;
use std::path::Path;

use crate::config;
use crate::db::{AuditRecord, AuditStore, AuditSummary, HistoryQuery};
use crate::error::Error;
use crate::verdict::Status;

/// Print totals and the most recent records.
pub fn run(limit: usize, status: Option<Status>) -> Result<(), Error> {
    let project_root = std::env::current_dir()?;
    let db_path = config::audit_db_path(&project_root)?;

    let query = HistoryQuery {
        status,
        limit: Some(limit),
    };
    match read_history(&db_path, &query)? {
        Some(report) => print!("{}", report),
        None => println!("No audit records yet. Try committing a few changes first."),
    }
    Ok(())
}

/// Render the log at `db_path`, or `None` when no log exists yet.
///
/// The database is opened read-only and never created or migrated.
pub fn read_history(db_path: &Path, query: &HistoryQuery) -> Result<Option<String>, Error> {
    if !db_path.exists() {
        return Ok(None);
    }

    let store = AuditStore::open_read_only(db_path)?;
    let summary = store.summary()?;
    let records = store.list(query)?;
    Ok(Some(render_history(&summary, &records)))
}

/// Format totals followed by one block per record.
pub fn render_history(summary: &AuditSummary, records: &[AuditRecord]) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Total: {}  Passed: {}  Blocked: {}",
        summary.total, summary.passed, summary.failed
    );
    if let Some(rate) = summary.pass_rate() {
        let _ = writeln!(out, "Pass rate: {:.1}%", rate);
    }

    if records.is_empty() {
        let _ = writeln!(out, "\nNo matching records.");
        return out;
    }

    for record in records {
        let _ = writeln!(
            out,
            "\n#{} [{}] {}  {}",
            record.id, record.status, record.timestamp, record.message
        );
        // Older rows or hand-edited payloads may not decode; show what we can.
        if let Ok(verdict) = record.verdict() {
            for detail in &verdict.details {
                let _ = writeln!(out, "    - {}", detail);
            }
        }
    }

    out
}
