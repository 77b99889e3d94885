use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::StoreError;
use crate::models::Book;

/// Fetch the whole catalog, ordered case-insensitively so mixed-case titles
/// group together in the UI.
pub fn fetch_books(conn: &Connection) -> Result<Vec<Book>> {
    let mut stmt = conn
        .prepare(
            "SELECT book_id, book_name, book_author
             FROM books
             ORDER BY book_name COLLATE NOCASE, book_author COLLATE NOCASE",
        )
        .context("failed to prepare book query")?;

    let books = stmt
        .query_map([], |row| {
            Ok(Book {
                id: row.get(0)?,
                name: row.get(1)?,
                author: row.get(2)?,
            })
        })
        .context("failed to iterate books")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect books")?;

    Ok(books)
}

/// Get every book linked to a specific category. Used by the list view when
/// the user narrows the catalog through the category picker.
pub fn fetch_books_in_category(conn: &Connection, category_id: i64) -> Result<Vec<Book>> {
    let mut stmt = conn
        .prepare(
            "SELECT b.book_id, b.book_name, b.book_author
             FROM books b
             INNER JOIN book_categories bc ON bc.book_id = b.book_id
             WHERE bc.category_id = ?1
             ORDER BY b.book_name COLLATE NOCASE, b.book_author COLLATE NOCASE",
        )
        .context("failed to prepare category books query")?;

    let books = stmt
        .query_map([category_id], |row| {
            Ok(Book {
                id: row.get(0)?,
                name: row.get(1)?,
                author: row.get(2)?,
            })
        })
        .context("failed to iterate category books")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect category books")?;

    Ok(books)
}

/// Insert a brand new book. We echo the hydrated struct so callers can update
/// UI state without having to re-query the database.
pub fn create_book(conn: &Connection, name: &str, author: &str) -> Result<Book> {
    conn.execute(
        "INSERT INTO books (book_name, book_author) VALUES (?1, ?2)",
        params![name, author],
    )
    .context("failed to insert book")?;

    let id = conn.last_insert_rowid();
    Ok(Book {
        id,
        name: name.to_string(),
        author: author.to_string(),
    })
}

/// Update all editable book fields. Like other update helpers, we surface an
/// explicit error when zero rows are touched.
pub fn update_book(conn: &Connection, id: i64, name: &str, author: &str) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE books SET book_name = ?1, book_author = ?2 WHERE book_id = ?3",
            params![name, author, id],
        )
        .context("failed to update book")?;

    if updated == 0 {
        Err(StoreError::NotFound { entity: "Book" }.into())
    } else {
        Ok(())
    }
}

/// Permanently delete a book. Both the join table and the borrow table
/// cascade automatically, so category links and loans vanish with the row.
pub fn delete_book(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM books WHERE book_id = ?1", params![id])
        .context("failed to delete book")?;

    if deleted == 0 {
        Err(StoreError::NotFound { entity: "Book" }.into())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::open_memory;
    use crate::db::{
        create_category, create_user, fetch_book_categories, fetch_borrowed_books,
        replace_book_categories, replace_user_borrows,
    };

    #[test]
    fn create_then_fetch_round_trips() {
        let conn = open_memory().unwrap();
        let created = create_book(&conn, "Dune", "Frank Herbert").unwrap();

        let books = fetch_books(&conn).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, created.id);
        assert_eq!(books[0].name, "Dune");
        assert_eq!(books[0].author, "Frank Herbert");
    }

    #[test]
    fn update_overwrites_prior_values() {
        let conn = open_memory().unwrap();
        let book = create_book(&conn, "Dune", "F. Herbert").unwrap();

        update_book(&conn, book.id, "Dune Messiah", "Frank Herbert").unwrap();

        let books = fetch_books(&conn).unwrap();
        assert_eq!(books[0].name, "Dune Messiah");
        assert_eq!(books[0].author, "Frank Herbert");
    }

    #[test]
    fn update_missing_book_errors() {
        let conn = open_memory().unwrap();
        assert!(update_book(&conn, 9, "Ghost", "Nobody").is_err());
    }

    #[test]
    fn fetch_books_in_category_filters_by_join_rows() {
        let mut conn = open_memory().unwrap();
        let sf = create_category(&conn, "Science Fiction").unwrap();
        let history = create_category(&conn, "History").unwrap();
        let dune = create_book(&conn, "Dune", "Frank Herbert").unwrap();
        let spqr = create_book(&conn, "SPQR", "Mary Beard").unwrap();
        replace_book_categories(&mut conn, dune.id, &[sf.id]).unwrap();
        replace_book_categories(&mut conn, spqr.id, &[history.id]).unwrap();

        let in_sf = fetch_books_in_category(&conn, sf.id).unwrap();
        assert_eq!(in_sf.len(), 1);
        assert_eq!(in_sf[0].id, dune.id);
    }

    #[test]
    fn delete_cascades_into_join_and_borrow_rows() {
        let mut conn = open_memory().unwrap();
        let category = create_category(&conn, "Science Fiction").unwrap();
        let user = create_user(&conn, "Ada", "555-0100", "12 Crescent Rd").unwrap();
        let book = create_book(&conn, "Dune", "Frank Herbert").unwrap();
        replace_book_categories(&mut conn, book.id, &[category.id]).unwrap();
        replace_user_borrows(&mut conn, user.id, &[book.id]).unwrap();

        delete_book(&conn, book.id).unwrap();

        assert!(fetch_book_categories(&conn).unwrap().is_empty());
        assert!(fetch_borrowed_books(&conn).unwrap().is_empty());
    }
}
