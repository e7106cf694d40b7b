//! Audit trail of vault operations, kept in SQLite next to the vault.
//!
//! Rows carry the operation, the vault path, an optional entry id and a
//! short note. Entry secrets and passphrases never reach this module.
//! A database that cannot be opened or written is skipped: the audit
//! trail must never block a vault operation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use crate::errors::{Result, VaultError};

/// File name of the audit database inside the vault directory.
pub const DB_FILE: &str = "audit.db";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS events (
    seq       INTEGER PRIMARY KEY AUTOINCREMENT,
    at        TEXT NOT NULL,
    op        TEXT NOT NULL,
    vault     TEXT NOT NULL,
    entry_id  TEXT,
    note      TEXT
);
CREATE INDEX IF NOT EXISTS events_entry ON events (entry_id);";

/// One recorded event.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub seq: i64,
    pub at: DateTime<Utc>,
    pub op: String,
    pub vault: String,
    pub entry_id: Option<String>,
    pub note: Option<String>,
}

/// Filter for `AuditLog::query`. Results are newest first.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    pub limit: usize,
    pub since: Option<DateTime<Utc>>,
    /// Only events whose entry id starts with this prefix.
    pub entry_id: Option<String>,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            since: None,
            entry_id: None,
        }
    }
}

pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open or create `<vault_dir>/audit.db`, owner-only on Unix.
    ///
    /// `None` means auditing is unavailable; callers carry on without it.
    pub fn open(vault_dir: &Path) -> Option<Self> {
        let path = Self::db_path(vault_dir);
        let conn = match Connection::open(&path) {
            Ok(conn) => conn,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "audit database unavailable");
                return None;
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
        }

        if let Err(e) = conn.execute_batch(SCHEMA) {
            debug!(error = %e, "audit schema setup failed");
            return None;
        }
        Some(Self { conn })
    }

    pub fn db_path(vault_dir: &Path) -> PathBuf {
        vault_dir.join(DB_FILE)
    }

    /// Append one event. Failures are logged at debug level and dropped.
    pub fn record(&self, op: &str, vault: &str, entry_id: Option<&str>, note: Option<&str>) {
        let at = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT INTO events (at, op, vault, entry_id, note) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![at, op, vault, entry_id, note],
        );
        if let Err(e) = inserted {
            debug!(op, error = %e, "audit event dropped");
        }
    }

    pub fn query(&self, filter: &AuditQuery) -> Result<Vec<AuditEvent>> {
        let limit = i64::try_from(filter.limit).unwrap_or(i64::MAX);
        let since = filter.since.map(|t| t.to_rfc3339());

        let mut stmt = self
            .conn
            .prepare(
                "SELECT seq, at, op, vault, entry_id, note FROM events
                 WHERE (?1 IS NULL OR at >= ?1) AND (?2 IS NULL OR entry_id LIKE ?2 || '%')
                 ORDER BY seq DESC
                 LIMIT ?3",
            )
            .map_err(|e| VaultError::AuditError(format!("prepare: {e}")))?;

        let rows = stmt
            .query_map(params![since, filter.entry_id, limit], |row| {
                let at: String = row.get(1)?;
                Ok(AuditEvent {
                    seq: row.get(0)?,
                    at: DateTime::parse_from_rfc3339(&at)
                        .map_or(DateTime::<Utc>::UNIX_EPOCH, |t| t.with_timezone(&Utc)),
                    op: row.get(2)?,
                    vault: row.get(3)?,
                    entry_id: row.get(4)?,
                    note: row.get(5)?,
                })
            })
            .map_err(|e| VaultError::AuditError(format!("query: {e}")))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| VaultError::AuditError(format!("read row: {e}")))
    }
}

/// Record `op` for the vault file at `vault_path` in the database beside it.
pub fn record_for_vault(vault_path: &Path, op: &str, entry_id: Option<&str>, note: Option<&str>) {
    let dir = match vault_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if let Some(log) = AuditLog::open(dir) {
        log.record(op, &vault_path.display().to_string(), entry_id, note);
    }
}
