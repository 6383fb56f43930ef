//! SQLite audit store.
//!
//! One append-only `logs` table. Rows are never updated or deleted here.

mod schema;

pub use schema::{init_db, AuditRecord, NewAuditRecord};

use std::path::{Path, PathBuf};

use chrono::Local;
use rusqlite::{Connection, OpenFlags};

use crate::error::Error;
use crate::verdict::Status;

/// Timestamp format stored in `logs.timestamp`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Filter for reading the audit log.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub status: Option<Status>,
    pub limit: Option<usize>,
}

/// Pass/fail totals across the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditSummary {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
}

impl AuditSummary {
    /// Percentage of runs that passed, if any ran.
    pub fn pass_rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.passed as f64 * 100.0 / self.total as f64)
        }
    }
}

/// Destination for gate decisions.
pub trait AuditSink {
    /// Persist one record, returning its id.
    fn record(&self, record: &NewAuditRecord) -> Result<i64, Error>;
}

/// Audit log file opened on each write, so the file only appears once
/// there is something to record.
#[derive(Debug, Clone)]
pub struct AuditFile {
    path: PathBuf,
}

impl AuditFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for AuditFile {
    fn record(&self, record: &NewAuditRecord) -> Result<i64, Error> {
        let store = AuditStore::open(&self.path).map_err(|e| match e {
            Error::Storage(e) => Error::AuditWrite(e),
            other => other,
        })?;
        store.append(record)
    }
}

impl AuditSink for AuditStore {
    fn record(&self, record: &NewAuditRecord) -> Result<i64, Error> {
        self.append(record)
    }
}

/// Audit log connection wrapper.
pub struct AuditStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl AuditStore {
    /// Open or create the store at path.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let conn = Connection::open(path)?;
        init_db(&conn)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an existing store without creating or migrating anything.
    ///
    /// Writes through this handle fail.
    pub fn open_read_only(path: &Path) -> Result<Self, Error> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open in-memory store for testing.
    pub fn open_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        init_db(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// File backing this store, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one record, returning its id.
    pub fn append(&self, record: &NewAuditRecord) -> Result<i64, Error> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.conn
            .execute(
                r#"
                INSERT INTO logs (timestamp, status, message, diff, context, ai_response)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                rusqlite::params![
                    timestamp,
                    record.status.as_str(),
                    record.message,
                    record.diff,
                    record.context,
                    record.ai_response,
                ],
            )
            .map_err(Error::AuditWrite)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Records newest first.
    pub fn list(&self, query: &HistoryQuery) -> Result<Vec<AuditRecord>, Error> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = query.limit.map(|l| l as i64).unwrap_or(-1);
        let status = query.status.map(|s| s.as_str());

        let mut stmt = self.conn.prepare(
            r#"
            SELECT * FROM logs
            WHERE ?1 IS NULL OR status = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(rusqlite::params![status, limit], AuditRecord::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Get a record by id.
    pub fn get(&self, id: i64) -> Result<Option<AuditRecord>, Error> {
        let mut stmt = self.conn.prepare("SELECT * FROM logs WHERE id = ?1")?;
        let mut rows = stmt.query([id])?;

        if let Some(row) = rows.next()? {
            Ok(Some(AuditRecord::from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Totals by status.
    pub fn summary(&self) -> Result<AuditSummary, Error> {
        let summary = self.conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'PASS' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'FAIL' THEN 1 ELSE 0 END), 0)
            FROM logs
            "#,
            [],
            |row| {
                Ok(AuditSummary {
                    total: row.get::<_, i64>(0)? as u64,
                    passed: row.get::<_, i64>(1)? as u64,
                    failed: row.get::<_, i64>(2)? as u64,
                })
            },
        )?;
        Ok(summary)
    }
}
