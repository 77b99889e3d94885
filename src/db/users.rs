use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::StoreError;
use crate::models::User;

/// Retrieve every user sorted case-insensitively by name. The query doubles
/// as the single source of truth for how we order users in the UI.
pub fn fetch_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare(
            "SELECT user_id, user_name, user_telephone, user_address
             FROM users
             ORDER BY user_name COLLATE NOCASE",
        )
        .context("failed to prepare user query")?;

    let users = stmt
        .query_map([], |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                telephone: row.get(2)?,
                address: row.get(3)?,
            })
        })
        .context("failed to iterate users")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect users")?;

    Ok(users)
}

/// Insert a new user row, returning the hydrated struct so the caller can
/// push it straight into the in-memory list.
pub fn create_user(conn: &Connection, name: &str, telephone: &str, address: &str) -> Result<User> {
    conn.execute(
        "INSERT INTO users (user_name, user_telephone, user_address) VALUES (?1, ?2, ?3)",
        params![name, telephone, address],
    )
    .context("failed to insert user")?;

    let id = conn.last_insert_rowid();
    Ok(User {
        id,
        name: name.to_string(),
        telephone: telephone.to_string(),
        address: address.to_string(),
    })
}

/// Update all editable user fields. We surface an explicit error when zero
/// rows are touched so the UI can show a friendly message instead of silently
/// continuing.
pub fn update_user(
    conn: &Connection,
    id: i64,
    name: &str,
    telephone: &str,
    address: &str,
) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE users SET user_name = ?1, user_telephone = ?2, user_address = ?3
             WHERE user_id = ?4",
            params![name, telephone, address, id],
        )
        .context("failed to update user")?;

    if updated == 0 {
        Err(StoreError::NotFound { entity: "User" }.into())
    } else {
        Ok(())
    }
}

/// Remove a user row. The schema cascades to `borrowed_books`, so any open
/// loans disappear without additional cleanup.
pub fn delete_user(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM users WHERE user_id = ?1", params![id])
        .context("failed to delete user")?;

    if deleted == 0 {
        Err(StoreError::NotFound { entity: "User" }.into())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::open_memory;
    use crate::db::{create_book, fetch_borrowed_books, replace_user_borrows};

    #[test]
    fn create_then_fetch_round_trips() {
        let conn = open_memory().unwrap();
        let created = create_user(&conn, "Ada", "555-0100", "12 Crescent Rd").unwrap();

        let users = fetch_users(&conn).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, created.id);
        assert_eq!(users[0].name, "Ada");
        assert_eq!(users[0].telephone, "555-0100");
        assert_eq!(users[0].address, "12 Crescent Rd");
    }

    #[test]
    fn fetch_orders_by_name() {
        let conn = open_memory().unwrap();
        create_user(&conn, "zoe", "1", "a").unwrap();
        create_user(&conn, "Ben", "2", "b").unwrap();

        let names: Vec<String> = fetch_users(&conn)
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["Ben".to_string(), "zoe".to_string()]);
    }

    #[test]
    fn update_overwrites_prior_values() {
        let conn = open_memory().unwrap();
        let user = create_user(&conn, "Ada", "555-0100", "12 Crescent Rd").unwrap();

        update_user(&conn, user.id, "Ada L", "555-0199", "14 Crescent Rd").unwrap();

        let users = fetch_users(&conn).unwrap();
        assert_eq!(users[0].name, "Ada L");
        assert_eq!(users[0].telephone, "555-0199");
        assert_eq!(users[0].address, "14 Crescent Rd");
    }

    #[test]
    fn update_missing_user_errors() {
        let conn = open_memory().unwrap();
        let err = update_user(&conn, 42, "Nobody", "0", "nowhere").unwrap_err();
        assert_eq!(err.to_string(), "User not found");
    }

    #[test]
    fn delete_missing_user_errors() {
        let conn = open_memory().unwrap();
        assert!(delete_user(&conn, 42).is_err());
    }

    #[test]
    fn delete_cascades_into_borrow_rows() {
        let mut conn = open_memory().unwrap();
        let user = create_user(&conn, "Ada", "555-0100", "12 Crescent Rd").unwrap();
        let book = create_book(&conn, "Dune", "Frank Herbert").unwrap();
        replace_user_borrows(&mut conn, user.id, &[book.id]).unwrap();
        assert_eq!(fetch_borrowed_books(&conn).unwrap().len(), 1);

        delete_user(&conn, user.id).unwrap();
        assert!(fetch_borrowed_books(&conn).unwrap().is_empty());
    }
}
