//! Token Blacklist
//! Mission: Remember revoked token strings until they would have expired anyway

use crate::db::{open_connection, StoreError};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use tracing::debug;

/// Revocation store contract consumed by the auth service.
pub trait TokenBlacklist: Send + Sync {
    /// Record a revoked token. A token that is already present yields
    /// [`StoreError::Duplicate`].
    fn add(&self, token: &str, expires_at: i64) -> Result<(), StoreError>;

    /// Whether `token` has a row. Absence says nothing about whether it was ever issued.
    fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError>;

    /// Delete every entry with `expires_at < now`; returns how many were removed.
    fn purge_expired(&self, now: i64) -> Result<usize, StoreError>;
}

/// Blacklist persisted in its own SQLite database
pub struct SqliteTokenBlacklist {
    conn: Mutex<Connection>,
}

impl SqliteTokenBlacklist {
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        let conn = open_connection(db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS blacklisted_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token TEXT UNIQUE NOT NULL,
                expires_at INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_blacklisted_tokens_expires_at
             ON blacklisted_tokens(expires_at)",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl TokenBlacklist for SqliteTokenBlacklist {
    fn add(&self, token: &str, expires_at: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO blacklisted_tokens (token, expires_at, created_at)
             VALUES (?1, ?2, ?3)",
            params![token, expires_at, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM blacklisted_tokens WHERE token = ?1)",
            params![token],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn purge_expired(&self, now: i64) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM blacklisted_tokens WHERE expires_at < ?1",
            params![now],
        )?;
        debug!("Purged {} expired blacklist entries", deleted);
        Ok(deleted)
    }
}

/// Process-local blacklist, for tests and single-instance deployments
#[derive(Default)]
pub struct InMemoryTokenBlacklist {
    entries: RwLock<HashMap<String, i64>>,
}

impl InMemoryTokenBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl TokenBlacklist for InMemoryTokenBlacklist {
    fn add(&self, token: &str, expires_at: i64) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        if entries.contains_key(token) {
            return Err(StoreError::Duplicate);
        }
        entries.insert(token.to_string(), expires_at);
        Ok(())
    }

    fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.entries.read().contains_key(token))
    }

    fn purge_expired(&self, now: i64) -> Result<usize, StoreError> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at >= now);
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn exercise_contract(blacklist: &dyn TokenBlacklist) {
        assert!(!blacklist.is_blacklisted("t1").unwrap());

        blacklist.add("t1", 100).unwrap();
        blacklist.add("t2", 200).unwrap();
        blacklist.add("t3", 300).unwrap();
        assert!(blacklist.is_blacklisted("t1").unwrap());

        assert!(matches!(
            blacklist.add("t1", 999),
            Err(StoreError::Duplicate)
        ));

        // Strictly older than `now` goes; an entry expiring exactly at `now` stays.
        assert_eq!(blacklist.purge_expired(200).unwrap(), 1);
        assert!(!blacklist.is_blacklisted("t1").unwrap());
        assert!(blacklist.is_blacklisted("t2").unwrap());
        assert!(blacklist.is_blacklisted("t3").unwrap());

        assert_eq!(blacklist.purge_expired(200).unwrap(), 0);
        assert_eq!(blacklist.purge_expired(1_000).unwrap(), 2);
        assert!(!blacklist.is_blacklisted("t3").unwrap());
    }

    #[test]
    fn test_sqlite_blacklist_contract() {
        let temp_file = NamedTempFile::new().unwrap();
        let blacklist = SqliteTokenBlacklist::new(temp_file.path().to_str().unwrap()).unwrap();
        exercise_contract(&blacklist);
    }

    #[test]
    fn test_in_memory_blacklist_contract() {
        let blacklist = InMemoryTokenBlacklist::new();
        exercise_contract(&blacklist);
        assert!(blacklist.is_empty());
    }

    #[test]
    fn test_sqlite_blacklist_survives_reopen() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        SqliteTokenBlacklist::new(path)
            .unwrap()
            .add("revoked", i64::MAX)
            .unwrap();

        let reopened = SqliteTokenBlacklist::new(path).unwrap();
        assert!(reopened.is_blacklisted("revoked").unwrap());
    }

    #[test]
    fn test_expired_entries_stay_authoritative_until_purged() {
        let blacklist = InMemoryTokenBlacklist::new();
        blacklist.add("old", 10).unwrap();
        assert!(blacklist.is_blacklisted("old").unwrap());
        assert_eq!(blacklist.len(), 1);
    }
}
