//! Item Storage
//! Mission: Persist item listings in the users database

use crate::db::{open_connection, StoreError};
use crate::items::models::{CreateItemRequest, Item, UpdateItemRequest};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

pub trait ItemStore: Send + Sync {
    fn find_all(&self) -> Result<Vec<Item>, StoreError>;

    /// Only returns the item if `owner_id` owns it.
    fn find_by_id(&self, item_id: i64, owner_id: i64) -> Result<Option<Item>, StoreError>;

    fn create(&self, owner_id: i64, item: &CreateItemRequest) -> Result<Item, StoreError>;

    /// Apply the present fields of `patch` to an item owned by `owner_id`.
    /// Yields [`StoreError::NotFound`] when no such item exists.
    fn update(
        &self,
        item_id: i64,
        owner_id: i64,
        patch: &UpdateItemRequest,
    ) -> Result<Item, StoreError>;

    /// Delete regardless of owner. Yields [`StoreError::NotFound`] when absent.
    fn delete(&self, item_id: i64) -> Result<(), StoreError>;
}

pub struct SqliteItemStore {
    conn: Mutex<Connection>,
}

impl SqliteItemStore {
    /// Open `db_path`, which must be the same database as the user store.
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        let conn = open_connection(db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                price INTEGER NOT NULL,
                description TEXT,
                sold_out INTEGER NOT NULL DEFAULT 0,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_items_user_id ON items(user_id)",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
        Ok(Item {
            id: row.get(0)?,
            name: row.get(1)?,
            price: row.get(2)?,
            description: row.get(3)?,
            sold_out: row.get(4)?,
            user_id: row.get(5)?,
        })
    }

    fn select_owned(
        conn: &Connection,
        item_id: i64,
        owner_id: i64,
    ) -> rusqlite::Result<Option<Item>> {
        conn.query_row(
            "SELECT id, name, price, description, sold_out, user_id
             FROM items WHERE id = ?1 AND user_id = ?2",
            params![item_id, owner_id],
            Self::row_to_item,
        )
        .optional()
    }
}

impl ItemStore for SqliteItemStore {
    fn find_all(&self) -> Result<Vec<Item>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, price, description, sold_out, user_id
             FROM items ORDER BY id",
        )?;
        let items = stmt
            .query_map([], Self::row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn find_by_id(&self, item_id: i64, owner_id: i64) -> Result<Option<Item>, StoreError> {
        let conn = self.conn.lock();
        Ok(Self::select_owned(&conn, item_id, owner_id)?)
    }

    fn create(&self, owner_id: i64, item: &CreateItemRequest) -> Result<Item, StoreError> {
        let conn = self.conn.lock();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO items (name, price, description, sold_out, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?5)",
            params![item.name, item.price, item.description, owner_id, now],
        )?;
        let id = conn.last_insert_rowid();

        info!("Created item {} ({}) for user {}", id, item.name, owner_id);

        Ok(Item {
            id,
            name: item.name.clone(),
            price: item.price,
            description: item.description.clone(),
            sold_out: false,
            user_id: owner_id,
        })
    }

    fn update(
        &self,
        item_id: i64,
        owner_id: i64,
        patch: &UpdateItemRequest,
    ) -> Result<Item, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE items SET
                name = COALESCE(?1, name),
                price = COALESCE(?2, price),
                description = COALESCE(?3, description),
                sold_out = COALESCE(?4, sold_out),
                updated_at = ?5
             WHERE id = ?6 AND user_id = ?7",
            params![
                patch.name,
                patch.price,
                patch.description,
                patch.sold_out,
                Utc::now().to_rfc3339(),
                item_id,
                owner_id
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }

        let item = Self::select_owned(&tx, item_id, owner_id)?.ok_or(StoreError::NotFound)?;
        tx.commit()?;
        Ok(item)
    }

    fn delete(&self, item_id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM items WHERE id = ?1", params![item_id])?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        info!("Deleted item {}", item_id);
        Ok(())
    }
}
