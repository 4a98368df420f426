//! Account and session queries.

use super::{StoreError, StoreResult};
use crate::models::User;
use chrono::{TimeDelta, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

const COLUMNS: &str = "id, username, email, password_hash, is_staff, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        is_staff: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn create(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
    is_staff: bool,
) -> StoreResult<User> {
    conn.execute(
        "INSERT INTO users (username, email, password_hash, is_staff, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![username, email, password_hash, is_staff, Utc::now()],
    )
    .map_err(StoreError::from_constraint)?;
    get(conn, conn.last_insert_rowid())
}

pub fn get(conn: &Connection, id: i64) -> StoreResult<User> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
}

pub fn find_by_username(conn: &Connection, username: &str) -> StoreResult<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            from_row,
        )
        .optional()?)
}

/// Users with an email address, the audience of new-item notifications.
pub fn with_email(conn: &Connection) -> StoreResult<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM users WHERE email != '' ORDER BY id"
    ))?;
    let rows = stmt.query_map([], from_row)?;
    Ok(rows.collect::<Result<_, _>>()?)
}

/// Promote or demote an existing account.
pub fn set_staff(conn: &Connection, id: i64, is_staff: bool) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE users SET is_staff = ?1 WHERE id = ?2",
        params![is_staff, id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("user {id}")));
    }
    Ok(())
}

// =============================================================================
// Sessions
// =============================================================================

pub fn create_session(conn: &Connection, token: &str, user_id: i64) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![token, user_id, Utc::now()],
    )?;
    Ok(())
}

/// The account behind `token`, unless the session is older than `ttl`.
pub fn user_for_session(conn: &Connection, token: &str, ttl: TimeDelta) -> StoreResult<Option<User>> {
    Ok(conn
        .query_row(
            "SELECT u.id, u.username, u.email, u.password_hash, u.is_staff, u.created_at \
             FROM sessions s JOIN users u ON u.id = s.user_id \
             WHERE s.token = ?1 AND s.created_at > ?2",
            params![token, Utc::now() - ttl],
            from_row,
        )
        .optional()?)
}

/// Remove sessions older than `ttl`. Returns how many were dropped.
pub fn purge_expired_sessions(conn: &Connection, ttl: TimeDelta) -> StoreResult<usize> {
    Ok(conn.execute(
        "DELETE FROM sessions WHERE created_at <= ?1",
        params![Utc::now() - ttl],
    )?)
}

pub fn delete_session(conn: &Connection, token: &str) -> StoreResult<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn ttl() -> TimeDelta {
        TimeDelta::days(14)
    }

    #[test]
    fn create_and_find() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();

        let user = create(&conn, "cook", "cook@example.com", "hash", false).unwrap();
        let found = find_by_username(&conn, "cook").unwrap().unwrap();
        assert_eq!(found, user);
        assert!(!found.is_staff);
    }

    #[test]
    fn duplicate_username_is_conflict() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        create(&conn, "cook", "a@example.com", "hash", false).unwrap();

        let err = create(&conn, "cook", "b@example.com", "hash", false).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref field } if field == "username"));
    }

    #[test]
    fn session_resolves_user_until_deleted() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let user = create(&conn, "cook", "cook@example.com", "hash", true).unwrap();

        create_session(&conn, "abc123", user.id).unwrap();
        assert_eq!(user_for_session(&conn, "abc123", ttl()).unwrap().unwrap().id, user.id);

        delete_session(&conn, "abc123").unwrap();
        assert!(user_for_session(&conn, "abc123", ttl()).unwrap().is_none());
    }

    fn backdate(conn: &Connection, token: &str, user_id: i64) {
        conn.execute(
            "INSERT INTO sessions (token, user_id, created_at) \
             VALUES (?1, ?2, '2000-01-01T00:00:00Z')",
            params![token, user_id],
        )
        .unwrap();
    }

    #[test]
    fn old_session_no_longer_resolves() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let user = create(&conn, "cook", "cook@example.com", "hash", false).unwrap();
        backdate(&conn, "stale", user.id);

        assert!(user_for_session(&conn, "stale", ttl()).unwrap().is_none());
    }

    #[test]
    fn purge_drops_only_expired_sessions() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let user = create(&conn, "cook", "cook@example.com", "hash", false).unwrap();
        backdate(&conn, "stale", user.id);
        create_session(&conn, "fresh", user.id).unwrap();

        assert_eq!(purge_expired_sessions(&conn, ttl()).unwrap(), 1);
        assert!(user_for_session(&conn, "fresh", ttl()).unwrap().is_some());
        let left: i64 = conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(left, 1);
    }

    #[test]
    fn with_email_skips_blank_addresses() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        create(&conn, "a", "a@example.com", "h", false).unwrap();
        create(&conn, "b", "", "h", false).unwrap();

        let users = with_email(&conn).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "a");
    }

    #[test]
    fn set_staff_promotes() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let user = create(&conn, "a", "a@example.com", "h", false).unwrap();
        set_staff(&conn, user.id, true).unwrap();
        assert!(get(&conn, user.id).unwrap().is_staff);
    }
}
