//! Item queries.

use super::{StoreError, StoreResult};
use crate::models::Item;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

/// Column values written on insert and update. `views` is never written
/// through here.
#[derive(Debug, Clone)]
pub struct ItemRow {
    pub name: String,
    pub summary: String,
    pub image: String,
    pub image_thumbnail: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
    pub slug: String,
    pub category_id: i64,
}

const COLUMNS: &str =
    "id, name, summary, image, image_thumbnail, content, published_at, slug, category_id, views";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        summary: row.get(2)?,
        image: row.get(3)?,
        image_thumbnail: row.get(4)?,
        content: row.get(5)?,
        published_at: row.get(6)?,
        slug: row.get(7)?,
        category_id: row.get(8)?,
        views: row.get(9)?,
    })
}

fn collect(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> StoreResult<Vec<Item>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, from_row)?;
    Ok(rows.collect::<Result<_, _>>()?)
}

pub fn get(conn: &Connection, id: i64) -> StoreResult<Item> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM items WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("item {id}")))
}

pub fn find_by_slug(conn: &Connection, slug: &str) -> StoreResult<Option<Item>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM items WHERE slug = ?1"),
            params![slug],
            from_row,
        )
        .optional()?)
}

/// Items of one category ordered by name.
pub fn list_in_category(conn: &Connection, category_id: i64) -> StoreResult<Vec<Item>> {
    collect(
        conn,
        &format!("SELECT {COLUMNS} FROM items WHERE category_id = ?1 ORDER BY name, id"),
        params![category_id],
    )
}

/// First item of a category by name.
pub fn first_in_category(conn: &Connection, category_id: i64) -> StoreResult<Option<Item>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM items WHERE category_id = ?1 ORDER BY name, id LIMIT 1"
            ),
            params![category_id],
            from_row,
        )
        .optional()?)
}

pub fn list_all(conn: &Connection) -> StoreResult<Vec<Item>> {
    collect(conn, &format!("SELECT {COLUMNS} FROM items ORDER BY name, id"), [])
}

/// Most viewed items, at most `limit`.
pub fn popular(conn: &Connection, limit: usize) -> StoreResult<Vec<Item>> {
    collect(
        conn,
        &format!("SELECT {COLUMNS} FROM items ORDER BY views DESC, name, id LIMIT ?1"),
        params![limit as i64],
    )
}

/// Columns (`"name"`, `"slug"`) already used by another item.
pub fn taken_fields(
    conn: &Connection,
    name: &str,
    slug: &str,
    exclude_id: Option<i64>,
) -> StoreResult<Vec<&'static str>> {
    let exclude = exclude_id.unwrap_or(-1);
    let mut taken = Vec::new();
    for (field, sql, value) in [
        ("name", "SELECT 1 FROM items WHERE name = ?1 AND id != ?2", name),
        ("slug", "SELECT 1 FROM items WHERE slug = ?1 AND id != ?2", slug),
    ] {
        let used = conn
            .query_row(sql, params![value, exclude], |_| Ok(()))
            .optional()?
            .is_some();
        if used {
            taken.push(field);
        }
    }
    Ok(taken)
}

pub fn insert(conn: &Connection, row: &ItemRow) -> StoreResult<Item> {
    conn.execute(
        "INSERT INTO items \
         (name, summary, image, image_thumbnail, content, published_at, slug, category_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            row.name,
            row.summary,
            row.image,
            row.image_thumbnail,
            row.content,
            row.published_at,
            row.slug,
            row.category_id,
        ],
    )
    .map_err(StoreError::from_constraint)?;
    get(conn, conn.last_insert_rowid())
}

pub fn update(conn: &Connection, id: i64, row: &ItemRow) -> StoreResult<Item> {
    let changed = conn
        .execute(
            "UPDATE items SET name = ?1, summary = ?2, image = ?3, image_thumbnail = ?4, \
             content = ?5, published_at = ?6, slug = ?7, category_id = ?8 WHERE id = ?9",
            params![
                row.name,
                row.summary,
                row.image,
                row.image_thumbnail,
                row.content,
                row.published_at,
                row.slug,
                row.category_id,
                id,
            ],
        )
        .map_err(StoreError::from_constraint)?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("item {id}")));
    }
    get(conn, id)
}

pub fn delete(conn: &Connection, id: i64) -> StoreResult<Item> {
    let item = get(conn, id)?;
    conn.execute("DELETE FROM items WHERE id = ?1", params![id])?;
    Ok(item)
}

/// Add one view in a single statement and return the new count.
pub fn increment_views(conn: &Connection, id: i64) -> StoreResult<i64> {
    conn.query_row(
        "UPDATE items SET views = views + 1 WHERE id = ?1 RETURNING views",
        params![id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("item {id}")))
}

pub fn reset_views(conn: &Connection, id: i64) -> StoreResult<()> {
    let changed = conn.execute("UPDATE items SET views = 0 WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("item {id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::categories::{self, CategoryRow};
    use crate::store::Store;
    use crate::slug::slugify;

    fn category(conn: &Connection, name: &str) -> i64 {
        categories::insert(
            conn,
            &CategoryRow {
                name: name.into(),
                summary: "s".into(),
                image: "images/c.jpg".into(),
                slug: slugify(name),
            },
        )
        .unwrap()
        .id
    }

    fn row(name: &str, category_id: i64) -> ItemRow {
        let slug = slugify(name);
        ItemRow {
            name: name.into(),
            summary: "A short summary".into(),
            image: format!("images/{slug}.png"),
            image_thumbnail: format!("images/{slug}_thumbnail.jpg"),
            content: "# Method\n\nStir.".into(),
            published_at: Utc::now(),
            slug,
            category_id,
        }
    }

    #[test]
    fn insert_starts_with_zero_views() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let cat = category(&conn, "Category 1");

        let item = insert(&conn, &row("Item 1-1", cat)).unwrap();
        assert_eq!(item.views, 0);
        assert_eq!(item.slug, "item-1-1");
        assert_eq!(item.category_id, cat);
    }

    #[test]
    fn list_in_category_is_ordered_and_scoped() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let a = category(&conn, "A");
        let b = category(&conn, "B");
        for name in ["Item 3", "Item 1", "Item 2"] {
            insert(&conn, &row(name, a)).unwrap();
        }
        insert(&conn, &row("Item 0", b)).unwrap();

        let names: Vec<_> = list_in_category(&conn, a)
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, ["Item 1", "Item 2", "Item 3"]);
        assert_eq!(first_in_category(&conn, a).unwrap().unwrap().name, "Item 1");
    }

    #[test]
    fn first_in_empty_category_is_none() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let a = category(&conn, "Empty");
        assert!(first_in_category(&conn, a).unwrap().is_none());
    }

    #[test]
    fn increment_views_is_cumulative() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let cat = category(&conn, "C");
        let item = insert(&conn, &row("Pho", cat)).unwrap();

        for expected in 1..=5 {
            assert_eq!(increment_views(&conn, item.id).unwrap(), expected);
        }
        assert_eq!(get(&conn, item.id).unwrap().views, 5);
    }

    #[test]
    fn increment_views_missing_item() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        assert!(matches!(increment_views(&conn, 99), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn reset_views_zeroes_counter() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let cat = category(&conn, "C");
        let item = insert(&conn, &row("Pho", cat)).unwrap();
        increment_views(&conn, item.id).unwrap();

        reset_views(&conn, item.id).unwrap();
        assert_eq!(get(&conn, item.id).unwrap().views, 0);
    }

    #[test]
    fn popular_orders_by_views() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let cat = category(&conn, "C");
        let a = insert(&conn, &row("A", cat)).unwrap();
        let b = insert(&conn, &row("B", cat)).unwrap();
        insert(&conn, &row("C", cat)).unwrap();
        increment_views(&conn, b.id).unwrap();
        increment_views(&conn, b.id).unwrap();
        increment_views(&conn, a.id).unwrap();

        let names: Vec<_> = popular(&conn, 2).unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[test]
    fn duplicate_slug_is_conflict() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let cat = category(&conn, "C");
        insert(&conn, &row("Item 1", cat)).unwrap();

        let mut clash = row("Item 1", cat);
        clash.name = "ITEM 1".into();
        let err = insert(&conn, &clash).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref field } if field == "slug"));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        assert!(matches!(
            insert(&conn, &row("Orphan", 42)),
            Err(StoreError::Database(_))
        ));
    }

    #[test]
    fn deleting_category_reattaches_items_to_default() {
        let store = Store::open_in_memory().unwrap();
        let mut conn = store.conn().unwrap();
        let general = category(&conn, "General");
        let soups = category(&conn, "Soups");
        let item = insert(&conn, &row("Tom Yum", soups)).unwrap();

        let (deleted, moved) = categories::delete(&mut conn, soups).unwrap();
        assert_eq!(deleted.name, "Soups");
        assert_eq!(moved, 1);
        assert_eq!(get(&conn, item.id).unwrap().category_id, general);
    }

    #[test]
    fn update_keeps_views() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let cat = category(&conn, "C");
        let item = insert(&conn, &row("Laksa", cat)).unwrap();
        increment_views(&conn, item.id).unwrap();

        let updated = update(&conn, item.id, &row("Curry Laksa", cat)).unwrap();
        assert_eq!(updated.views, 1);
        assert_eq!(updated.slug, "curry-laksa");
    }
}
