//! SQLite persistence.
//!
//! [`Store`] wraps an r2d2 pool. Queries are plain functions over a
//! `rusqlite::Connection` grouped per table ([`categories`], [`items`],
//! [`users`]) so they compose inside one transaction; async callers go
//! through [`Store::call`], which runs the closure on the blocking pool.
//!
//! Name and slug uniqueness are enforced by UNIQUE constraints. A violated
//! constraint surfaces as [`StoreError::Conflict`] naming the column.

pub mod categories;
pub mod items;
mod schema;
pub mod users;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{field} is already taken")]
    Conflict { field: String },
    #[error("Refused: {0}")]
    Protected(String),
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Map a UNIQUE violation to `Conflict { field }`, anything else to
    /// `Database`.
    pub(crate) fn from_constraint(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, Some(ref message)) = err {
            if failure.code == ErrorCode::ConstraintViolation {
                if let Some(column) = unique_column(message) {
                    return StoreError::Conflict {
                        field: column.to_string(),
                    };
                }
            }
        }
        StoreError::Database(err)
    }
}

/// `"UNIQUE constraint failed: items.slug"` → `Some("slug")`.
fn unique_column(message: &str) -> Option<&str> {
    let columns = message.strip_prefix("UNIQUE constraint failed: ")?;
    let first = columns.split(',').next()?.trim();
    Some(first.rsplit('.').next().unwrap_or(first))
}

/// Shared handle to the database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    pool: DbPool,
}

impl Store {
    /// Open (or create) the database file and bootstrap the schema.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(init_connection);
        let pool = Pool::builder().max_size(8).build(manager)?;
        let store = Self { pool };
        store.migrate()?;
        Ok(store)
    }

    /// Single-connection in-memory database for tests and dry runs.
    ///
    /// Every in-memory connection is its own database, so the pool is pinned
    /// to one connection that never expires.
    pub fn open_in_memory() -> StoreResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(init_connection);
        let pool = Pool::builder()
            .max_size(1)
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        let store = Self { pool };
        store.migrate()?;
        Ok(store)
    }

    /// Create missing tables and indexes. Idempotent.
    pub fn migrate(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        schema::bootstrap(&conn)
    }

    pub fn conn(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Run `f` with a pooled connection on tokio's blocking pool.
    pub async fn call<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }
}

fn init_connection(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_column_parses_sqlite_message() {
        assert_eq!(unique_column("UNIQUE constraint failed: items.slug"), Some("slug"));
        assert_eq!(
            unique_column("UNIQUE constraint failed: categories.name"),
            Some("name")
        );
        assert_eq!(unique_column("NOT NULL constraint failed: items.name"), None);
    }

    #[test]
    fn in_memory_store_is_migrated() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
                 AND name IN ('categories', 'items', 'users', 'sessions')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }

    #[test]
    fn migrate_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        store.migrate().unwrap();
        store.migrate().unwrap();
    }

    #[test]
    fn file_store_persists_between_opens() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("site.sqlite3");
        {
            let store = Store::open(&path).unwrap();
            let conn = store.conn().unwrap();
            conn.execute(
                "INSERT INTO users (username, email, password_hash, is_staff, created_at) \
                 VALUES ('cook', 'cook@example.com', 'x', 0, '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        }
        let store = Store::open(&path).unwrap();
        let count: i64 = store
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn call_runs_on_blocking_pool() {
        let store = Store::open_in_memory().unwrap();
        let one: i64 = store
            .call(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(one, 1);
    }
}
