//! SQLite plumbing shared by the credential, blacklist and item stores.

use rusqlite::{ffi, Connection};
use std::time::Duration;
use thiserror::Error;

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors surfaced by the persistent stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A UNIQUE / PRIMARY KEY constraint rejected the write.
    #[error("unique constraint violated")]
    Duplicate,

    /// The targeted row does not exist.
    #[error("record not found")]
    NotFound,

    /// A stored value could not be interpreted.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[source] rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if is_unique_violation(&err) {
            StoreError::Duplicate
        } else {
            StoreError::Sqlite(err)
        }
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

/// Open a connection with the pragmas every store relies on.
///
/// `":memory:"` yields a private in-memory database, which is only useful when
/// the caller keeps the returned connection for its whole lifetime.
pub fn open_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_duplicate() {
        let conn = open_connection(":memory:").unwrap();
        conn.execute("CREATE TABLE t (v TEXT UNIQUE NOT NULL)", [])
            .unwrap();
        conn.execute("INSERT INTO t (v) VALUES ('a')", []).unwrap();

        let err = conn
            .execute("INSERT INTO t (v) VALUES ('a')", [])
            .unwrap_err();
        assert!(matches!(StoreError::from(err), StoreError::Duplicate));
    }

    #[test]
    fn test_other_errors_stay_sqlite() {
        let conn = open_connection(":memory:").unwrap();
        let err = conn.execute("SELECT * FROM missing", []).unwrap_err();
        assert!(matches!(StoreError::from(err), StoreError::Sqlite(_)));
    }
}
