//! Category queries.

use super::{StoreError, StoreResult};
use crate::models::{Category, DEFAULT_CATEGORY_ID};
use rusqlite::{Connection, OptionalExtension, Row, params};

/// Column values written on insert and update.
#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub name: String,
    pub summary: String,
    pub image: String,
    pub slug: String,
}

const COLUMNS: &str = "id, name, summary, image, slug";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        summary: row.get(2)?,
        image: row.get(3)?,
        slug: row.get(4)?,
    })
}

/// All categories ordered by name.
pub fn list(conn: &Connection) -> StoreResult<Vec<Category>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM categories ORDER BY name, id"
    ))?;
    let rows = stmt.query_map([], from_row)?;
    Ok(rows.collect::<Result<_, _>>()?)
}

pub fn get(conn: &Connection, id: i64) -> StoreResult<Category> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM categories WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("category {id}")))
}

pub fn find_by_slug(conn: &Connection, slug: &str) -> StoreResult<Option<Category>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM categories WHERE slug = ?1"),
            params![slug],
            from_row,
        )
        .optional()?)
}

pub fn exists(conn: &Connection, id: i64) -> StoreResult<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM categories WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?
        .is_some())
}

/// Columns (`"name"`, `"slug"`) already used by another category.
pub fn taken_fields(
    conn: &Connection,
    name: &str,
    slug: &str,
    exclude_id: Option<i64>,
) -> StoreResult<Vec<&'static str>> {
    let exclude = exclude_id.unwrap_or(-1);
    let mut taken = Vec::new();
    let name_used = conn
        .query_row(
            "SELECT 1 FROM categories WHERE name = ?1 AND id != ?2",
            params![name, exclude],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if name_used {
        taken.push("name");
    }
    let slug_used = conn
        .query_row(
            "SELECT 1 FROM categories WHERE slug = ?1 AND id != ?2",
            params![slug, exclude],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if slug_used {
        taken.push("slug");
    }
    Ok(taken)
}

pub fn insert(conn: &Connection, row: &CategoryRow) -> StoreResult<Category> {
    conn.execute(
        "INSERT INTO categories (name, summary, image, slug) VALUES (?1, ?2, ?3, ?4)",
        params![row.name, row.summary, row.image, row.slug],
    )
    .map_err(StoreError::from_constraint)?;
    get(conn, conn.last_insert_rowid())
}

pub fn update(conn: &Connection, id: i64, row: &CategoryRow) -> StoreResult<Category> {
    let changed = conn
        .execute(
            "UPDATE categories SET name = ?1, summary = ?2, image = ?3, slug = ?4 WHERE id = ?5",
            params![row.name, row.summary, row.image, row.slug, id],
        )
        .map_err(StoreError::from_constraint)?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("category {id}")));
    }
    get(conn, id)
}

/// Delete a category. Its items move to the default category.
///
/// Returns the deleted category and the number of items that moved.
pub fn delete(conn: &mut Connection, id: i64) -> StoreResult<(Category, usize)> {
    if id == DEFAULT_CATEGORY_ID {
        return Err(StoreError::Protected(
            "the default category cannot be deleted".into(),
        ));
    }
    let tx = conn.transaction()?;
    let category = get(&tx, id)?;
    let moved: i64 = tx.query_row(
        "SELECT COUNT(*) FROM items WHERE category_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    if moved > 0 && !exists(&tx, DEFAULT_CATEGORY_ID)? {
        return Err(StoreError::Protected(
            "items cannot be reattached: the default category is missing".into(),
        ));
    }
    tx.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
    tx.commit()?;
    Ok((category, moved as usize))
}

/// Number of items per category id.
pub fn item_count(conn: &Connection, id: i64) -> StoreResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM items WHERE category_id = ?1",
        params![id],
        |row| row.get(0),
    )?)
}
