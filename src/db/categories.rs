use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::StoreError;
use crate::models::Category;

/// Retrieve every category sorted case-insensitively by name.
pub fn fetch_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn
        .prepare(
            "SELECT category_id, category_name FROM categories
             ORDER BY category_name COLLATE NOCASE",
        )
        .context("failed to prepare category query")?;

    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .context("failed to iterate categories")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect categories")?;

    Ok(categories)
}

/// Insert a new category row and echo the hydrated struct.
pub fn create_category(conn: &Connection, name: &str) -> Result<Category> {
    conn.execute(
        "INSERT INTO categories (category_name) VALUES (?1)",
        params![name],
    )
    .context("failed to insert category")?;

    let id = conn.last_insert_rowid();
    Ok(Category {
        id,
        name: name.to_string(),
    })
}

/// Rename an existing category, erroring when nothing was updated.
pub fn update_category(conn: &Connection, id: i64, name: &str) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE categories SET category_name = ?1 WHERE category_id = ?2",
            params![name, id],
        )
        .context("failed to update category")?;

    if updated == 0 {
        Err(StoreError::NotFound { entity: "Category" }.into())
    } else {
        Ok(())
    }
}

/// Remove a category row. The database schema cascades to `book_categories`,
/// so we do not have to delete the join rows manually.
pub fn delete_category(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM categories WHERE category_id = ?1", params![id])
        .context("failed to delete category")?;

    if deleted == 0 {
        Err(StoreError::NotFound { entity: "Category" }.into())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::open_memory;
    use crate::db::{create_book, fetch_book_categories, replace_book_categories};

    #[test]
    fn create_then_fetch_round_trips() {
        let conn = open_memory().unwrap();
        let created = create_category(&conn, "Science Fiction").unwrap();

        let categories = fetch_categories(&conn).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].id, created.id);
        assert_eq!(categories[0].name, "Science Fiction");
    }

    #[test]
    fn update_overwrites_prior_name() {
        let conn = open_memory().unwrap();
        let category = create_category(&conn, "Sci Fi").unwrap();

        update_category(&conn, category.id, "Science Fiction").unwrap();

        let categories = fetch_categories(&conn).unwrap();
        assert_eq!(categories[0].name, "Science Fiction");
    }

    #[test]
    fn update_missing_category_errors() {
        let conn = open_memory().unwrap();
        assert!(update_category(&conn, 7, "Ghost").is_err());
    }

    #[test]
    fn delete_cascades_into_join_rows() {
        let mut conn = open_memory().unwrap();
        let category = create_category(&conn, "History").unwrap();
        let book = create_book(&conn, "SPQR", "Mary Beard").unwrap();
        replace_book_categories(&mut conn, book.id, &[category.id]).unwrap();
        assert_eq!(fetch_book_categories(&conn).unwrap().len(), 1);

        delete_category(&conn, category.id).unwrap();
        assert!(fetch_book_categories(&conn).unwrap().is_empty());
    }
}
