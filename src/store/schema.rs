use super::StoreResult;
use rusqlite::Connection;

/// Items whose category is deleted fall back to category 1.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    name    TEXT NOT NULL UNIQUE,
    summary TEXT NOT NULL,
    image   TEXT NOT NULL,
    slug    TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS items (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL UNIQUE,
    summary         TEXT NOT NULL,
    image           TEXT NOT NULL,
    image_thumbnail TEXT NOT NULL,
    content         TEXT NOT NULL,
    published_at    TEXT NOT NULL,
    slug            TEXT NOT NULL UNIQUE,
    category_id     INTEGER NOT NULL DEFAULT 1
                    REFERENCES categories(id) ON DELETE SET DEFAULT,
    views           INTEGER NOT NULL DEFAULT 0 CHECK (views >= 0)
);

CREATE INDEX IF NOT EXISTS items_by_category ON items (category_id, name);
CREATE INDEX IF NOT EXISTS items_by_views ON items (views DESC);

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    is_staff      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token      TEXT PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);
"#;

pub(super) fn bootstrap(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
