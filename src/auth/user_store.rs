//! User Storage
//! Mission: Persist user accounts (email, password hash, role) in SQLite

use crate::auth::models::{User, UserRole};
use crate::db::{open_connection, StoreError};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{
    params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
    Connection, OptionalExtension, Row, ToSql, TransactionBehavior,
};
use tracing::info;

/// Credential store contract consumed by the auth service.
///
/// Soft-deleted users are invisible to every read and to the live count.
pub trait UserStore: Send + Sync {
    /// Insert a user whose role is chosen by `assign_role` from the current
    /// live user count. Counting and inserting happen atomically.
    fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        assign_role: &dyn Fn(i64) -> UserRole,
    ) -> Result<User, StoreError>;

    fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    fn count_users(&self) -> Result<i64, StoreError>;

    /// Administrative role change.
    fn set_role(&self, user_id: i64, role: UserRole) -> Result<(), StoreError>;

    fn soft_delete(&self, user_id: i64) -> Result<(), StoreError>;
}

impl ToSql for UserRole {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for UserRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// User storage with SQLite backend
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    /// Open the database at `db_path` and make sure the schema exists
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        let conn = open_connection(db_path)?;
        Self::init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_db(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_users_deleted_at ON users(deleted_at)",
            [],
        )?;
        Ok(())
    }

    fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            role: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn live_count(conn: &Connection) -> rusqlite::Result<i64> {
        conn.query_row(
            "SELECT COUNT(*) FROM users WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        assign_role: &dyn Fn(i64) -> UserRole,
    ) -> Result<User, StoreError> {
        let mut conn = self.conn.lock();
        // IMMEDIATE takes the write lock up front so a concurrent signup on
        // another connection cannot observe the same count.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let count = Self::live_count(&tx)?;
        let role = assign_role(count);
        let now = Utc::now().to_rfc3339();

        tx.execute(
            "INSERT INTO users (email, password_hash, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![email, password_hash, role, now],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!("Created user: {} ({}), live users before insert: {}", email, role, count);

        Ok(User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at: now,
        })
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock();
        let user = conn
            .query_row(
                "SELECT id, email, password_hash, role, created_at
                 FROM users WHERE email = ?1 AND deleted_at IS NULL",
                params![email],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn count_users(&self) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        Ok(Self::live_count(&conn)?)
    }

    fn set_role(&self, user_id: i64, role: UserRole) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE users SET role = ?1, updated_at = ?2
             WHERE id = ?3 AND deleted_at IS NULL",
            params![role, Utc::now().to_rfc3339(), user_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        info!("Changed role of user {} to {}", user_id, role);
        Ok(())
    }

    fn soft_delete(&self, user_id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let now = Utc::now().to_rfc3339();
        let rows = conn.execute(
            "UPDATE users SET deleted_at = ?1, updated_at = ?1
             WHERE id = ?2 AND deleted_at IS NULL",
            params![now, user_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        info!("Soft-deleted user {}", user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn first_is_admin(count: i64) -> UserRole {
        if count == 0 {
            UserRole::Admin
        } else {
            UserRole::User
        }
    }

    fn create_test_store() -> (SqliteUserStore, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = SqliteUserStore::new(db_path).unwrap();
        (store, temp_file)
    }

    #[test]
    fn test_create_and_find_user() {
        let (store, _temp) = create_test_store();

        let created = store
            .create_user("a@x.com", "hash-a", &first_is_admin)
            .unwrap();
        assert_eq!(created.role, UserRole::Admin);

        let found = store.find_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.password_hash, "hash-a");
        assert_eq!(found.role, UserRole::Admin);

        assert!(store.find_by_email("A@X.COM").unwrap().is_none());
    }

    #[test]
    fn test_role_rule_sees_live_count() {
        let (store, _temp) = create_test_store();

        let a = store.create_user("a@x.com", "h", &first_is_admin).unwrap();
        let b = store.create_user("b@x.com", "h", &first_is_admin).unwrap();
        assert_eq!(a.role, UserRole::Admin);
        assert_eq!(b.role, UserRole::User);
        assert_eq!(store.count_users().unwrap(), 2);
    }

    #[test]
    fn test_duplicate_email_is_reported() {
        let (store, _temp) = create_test_store();

        store.create_user("a@x.com", "h", &first_is_admin).unwrap();
        let err = store
            .create_user("a@x.com", "h2", &first_is_admin)
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
        assert_eq!(store.count_users().unwrap(), 1);
    }

    #[test]
    fn test_soft_deleted_users_are_hidden() {
        let (store, _temp) = create_test_store();

        let a = store.create_user("a@x.com", "h", &first_is_admin).unwrap();
        store.soft_delete(a.id).unwrap();

        assert!(store.find_by_email("a@x.com").unwrap().is_none());
        assert_eq!(store.count_users().unwrap(), 0);
        assert!(matches!(
            store.soft_delete(a.id),
            Err(StoreError::NotFound)
        ));

        // Population is empty again, so the next signup is admin.
        let b = store.create_user("b@x.com", "h", &first_is_admin).unwrap();
        assert_eq!(b.role, UserRole::Admin);
    }

    #[test]
    fn test_set_role() {
        let (store, _temp) = create_test_store();

        store.create_user("a@x.com", "h", &first_is_admin).unwrap();
        let b = store.create_user("b@x.com", "h", &first_is_admin).unwrap();

        store.set_role(b.id, UserRole::Admin).unwrap();
        let found = store.find_by_email("b@x.com").unwrap().unwrap();
        assert_eq!(found.role, UserRole::Admin);

        assert!(matches!(
            store.set_role(999, UserRole::User),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_concurrent_first_signups_yield_one_admin() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();

        // Separate connections so serialization comes from SQLite, not our mutex.
        let stores: Vec<Arc<SqliteUserStore>> = (0..8)
            .map(|_| Arc::new(SqliteUserStore::new(&db_path).unwrap()))
            .collect();

        std::thread::scope(|scope| {
            for (i, store) in stores.iter().enumerate() {
                scope.spawn(move || {
                    store
                        .create_user(&format!("u{}@x.com", i), "h", &first_is_admin)
                        .unwrap();
                });
            }
        });

        let conn = Connection::open(&db_path).unwrap();
        let admins: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'admin'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(admins, 1);
        assert_eq!(stores[0].count_users().unwrap(), 8);
    }
}
