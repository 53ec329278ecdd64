//! Hot store accessor: read/delete primitive over the SQLite source of truth
//!
//! Producers own inserts; this crate only counts, selects, and deletes aged
//! rows. Each category is one table whose name equals the category, with an
//! INTEGER `id` primary key and a per-category RFC-3339 timestamp column.
//! All age comparisons go through SQLite's `datetime()` so mixed timestamp
//! precision in producer data still orders correctly.
//!
//! Deletions run inside a single transaction: concurrent readers never see
//! a half-deleted batch.

use std::path::Path;

use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::debug;

use permafrost_core::{Cursor, HotRecord};

/// Errors raised by hot store access.
#[derive(Debug, Error)]
pub enum HotStoreError {
    /// Underlying SQLite failure.
    #[error("hot store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A table or column name that is not a plain identifier.
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// A selected row has no usable integer `id`.
    #[error("row in '{table}' has no integer id column")]
    MissingId {
        /// Table the row came from.
        table: String,
    },
}

/// Result alias for hot store operations.
pub type HotResult<T> = Result<T, HotStoreError>;

/// Read/delete handle over the hot SQLite database.
pub struct HotStore {
    conn: Connection,
}

impl HotStore {
    /// Open the hot database read-write (rows are deleted after archival,
    /// never inserted or updated by this crate).
    pub fn open(path: &Path) -> HotResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    /// Open the hot database read-only, for status inspection.
    pub fn open_read_only(path: &Path) -> HotResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> HotResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Direct access to the underlying connection, for test seeding.
    #[doc(hidden)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Number of records strictly older than `cutoff`.
    pub fn count_older_than(
        &self,
        table: &str,
        ts_column: &str,
        cutoff: DateTime<Utc>,
    ) -> HotResult<u64> {
        check_identifier(table)?;
        check_identifier(ts_column)?;
        // A category whose producers have not created a table yet simply
        // has nothing to archive.
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let sql = format!(
            "SELECT COUNT(*) FROM \"{table}\" WHERE datetime(\"{ts_column}\") < datetime(?1)"
        );
        let count: i64 = self
            .conn
            .query_row(&sql, [cutoff_text(cutoff)], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Total rows in a category table. A missing table counts as zero.
    pub fn count_rows(&self, table: &str) -> HotResult<u64> {
        check_identifier(table)?;
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let sql = format!("SELECT COUNT(*) FROM \"{table}\"");
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Select up to `limit` records older than `cutoff`, oldest first,
    /// ties broken by id, resuming after `after` when given.
    ///
    /// Repeated calls with the same cursor return the same batch: the
    /// selection itself never mutates anything, and producer inserts are
    /// newer than the cutoff by definition.
    pub fn select_batch(
        &self,
        table: &str,
        ts_column: &str,
        cutoff: DateTime<Utc>,
        limit: usize,
        after: Option<&Cursor>,
    ) -> HotResult<Vec<HotRecord>> {
        check_identifier(table)?;
        check_identifier(ts_column)?;
        let sql = format!(
            "SELECT * FROM \"{table}\" \
             WHERE datetime(\"{ts_column}\") < datetime(?1) \
               AND (?2 IS NULL \
                    OR datetime(\"{ts_column}\") > datetime(?2) \
                    OR (datetime(\"{ts_column}\") = datetime(?2) AND id > ?3)) \
             ORDER BY datetime(\"{ts_column}\") ASC, id ASC \
             LIMIT ?4"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let after_ts = after.map(|c| c.timestamp.clone());
        let after_id = after.map(|c| c.id);
        let mut rows = stmt.query(rusqlite::params![
            cutoff_text(cutoff),
            after_ts,
            after_id,
            limit as i64,
        ])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fields = Map::new();
            for (idx, name) in column_names.iter().enumerate() {
                fields.insert(name.clone(), column_to_json(row.get_ref(idx)?));
            }
            let id = fields
                .get("id")
                .and_then(Value::as_i64)
                .ok_or_else(|| HotStoreError::MissingId {
                    table: table.to_string(),
                })?;
            let timestamp = fields
                .get(ts_column)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            records.push(HotRecord {
                id,
                timestamp,
                fields,
            });
        }

        debug!(table, batch = records.len(), "selected hot batch");
        Ok(records)
    }

    /// Delete exactly the given ids, atomically.
    ///
    /// Runs in one transaction so a concurrent reader never observes a
    /// partially deleted batch. Returns the number of rows removed.
    pub fn delete_ids(&mut self, table: &str, ids: &[i64]) -> HotResult<usize> {
        check_identifier(table)?;
        if ids.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut deleted = 0usize;
        // SQLite's default parameter limit is 999; chunk well below it.
        for chunk in ids.chunks(500) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("DELETE FROM \"{table}\" WHERE id IN ({placeholders})");
            deleted += tx.execute(&sql, rusqlite::params_from_iter(chunk.iter()))?;
        }
        tx.commit()?;
        Ok(deleted)
    }

    fn table_exists(&self, table: &str) -> HotResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

/// Cutoff rendered the way producers write timestamps.
fn cutoff_text(cutoff: DateTime<Utc>) -> String {
    cutoff.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Reject anything that is not a plain SQL identifier before it is
/// interpolated into a statement.
fn check_identifier(name: &str) -> HotResult<()> {
    let mut chars = name.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_first && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(HotStoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Map one SQLite column value to JSON. BLOBs become base64 strings.
fn column_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
    }
}
