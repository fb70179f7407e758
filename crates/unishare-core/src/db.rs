// SQLite persistence layer: one string-keyed slot per collection.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;

/// A write was rejected because its serialized size exceeds the per-slot
/// quota. The previous slot value is left untouched.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("storage quota exceeded for slot `{key}`: {size} bytes > {limit} byte limit")]
pub struct QuotaExceeded {
    pub key: String,
    pub size: usize,
    pub limit: usize,
}

/// SQLite-backed key/value slots. Each slot holds one JSON document.
pub struct Database {
    conn: Mutex<Connection>,
    max_slot_bytes: Option<usize>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure the slot
    /// table exists. Pass `":memory:"` for an ephemeral in-memory database
    /// (useful for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS slots (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
            max_slot_bytes: None,
        })
    }

    /// Reject writes whose serialized value is larger than `limit` bytes.
    pub fn with_slot_quota(mut self, limit: Option<usize>) -> Self {
        self.max_slot_bytes = limit;
        self
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Read the raw JSON stored under `key`. Returns `None` if the slot has
    /// never been written.
    pub fn read_slot(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT value FROM slots WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("failed to read slot {key}"))
    }

    /// Replace the value stored under `key`. Uses INSERT OR REPLACE so the
    /// last write wins.
    pub fn write_slot(&self, key: &str, value: &str) -> Result<()> {
        if let Some(limit) = self.max_slot_bytes {
            if value.len() > limit {
                return Err(QuotaExceeded {
                    key: key.to_string(),
                    size: value.len(),
                    limit,
                }
                .into());
            }
        }

        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO slots (key, value, updated_at)
             VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
            params![key, value],
        )
        .with_context(|| format!("failed to write slot {key}"))?;
        debug!(key, bytes = value.len(), "slot written");
        Ok(())
    }

    /// Delete a slot. Returns `true` if a slot was removed.
    pub fn remove_slot(&self, key: &str) -> Result<bool> {
        let conn = self.conn();
        let n = conn
            .execute("DELETE FROM slots WHERE key = ?1", params![key])
            .with_context(|| format!("failed to remove slot {key}"))?;
        Ok(n > 0)
    }

    /// Read a slot and deserialize it. `None` if the slot is empty; a
    /// malformed document is an error.
    pub fn load_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_slot(key)? {
            Some(text) => {
                let value = serde_json::from_str(&text)
                    .with_context(|| format!("malformed JSON in slot {key}"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it under `key`.
    pub fn save_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let text = serde_json::to_string(value)
            .with_context(|| format!("failed to serialize slot {key}"))?;
        self.write_slot(key, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    #[test]
    fn open_creates_slot_table() {
        let db = test_db();
        let conn = db.conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"slots".to_string()));
    }

    #[test]
    fn read_missing_slot_is_none() {
        let db = test_db();
        assert_eq!(db.read_slot("nope").unwrap(), None);
    }

    #[test]
    fn write_overwrites_previous_value() {
        let db = test_db();
        db.write_slot("k", "1").unwrap();
        db.write_slot("k", "2").unwrap();
        assert_eq!(db.read_slot("k").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn remove_slot_reports_whether_it_existed() {
        let db = test_db();
        db.write_slot("k", "[]").unwrap();
        assert!(db.remove_slot("k").unwrap());
        assert!(!db.remove_slot("k").unwrap());
        assert_eq!(db.read_slot("k").unwrap(), None);
    }

    #[test]
    fn load_json_rejects_malformed_document() {
        let db = test_db();
        db.write_slot("broken", "{not json").unwrap();
        let err = db.load_json::<serde_json::Value>("broken").unwrap_err();
        assert!(err.to_string().contains("malformed JSON in slot broken"));
    }

    #[test]
    fn save_and_load_json() {
        let db = test_db();
        db.save_json("doc", &json!({"a": [1, 2]})).unwrap();
        let v: serde_json::Value = db.load_json("doc").unwrap().unwrap();
        assert_eq!(v["a"][1], 2);
    }

    #[test]
    fn quota_rejects_large_write_and_keeps_old_value() {
        let db = test_db().with_slot_quota(Some(8));
        db.write_slot("k", "small").unwrap();

        let err = db.write_slot("k", "much too large").unwrap_err();
        let quota = err.downcast_ref::<QuotaExceeded>().expect("quota error");
        assert_eq!(quota.limit, 8);
        assert_eq!(quota.size, 14);
        assert_eq!(db.read_slot("k").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn file_backed_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slots.db");
        let path = path.to_str().unwrap();

        Database::open(path).unwrap().write_slot("k", "\"v\"").unwrap();
        let reopened = Database::open(path).unwrap();
        assert_eq!(reopened.read_slot("k").unwrap().as_deref(), Some("\"v\""));
    }
}
