use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::models::BookCategory;

/// Full join-table read. The book list keeps these rows in memory so it can
/// resolve category names per book with a linear scan instead of per-row
/// queries.
pub fn fetch_book_categories(conn: &Connection) -> Result<Vec<BookCategory>> {
    let mut stmt = conn
        .prepare("SELECT book_category_id, book_id, category_id FROM book_categories")
        .context("failed to prepare book category query")?;

    let links = stmt
        .query_map([], |row| {
            Ok(BookCategory {
                id: row.get(0)?,
                book_id: row.get(1)?,
                category_id: row.get(2)?,
            })
        })
        .context("failed to iterate book categories")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect book categories")?;

    Ok(links)
}

/// The category ids currently linked to one book, used to pre-check the
/// category picker when editing.
pub fn fetch_category_ids_for_book(conn: &Connection, book_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn
        .prepare("SELECT category_id FROM book_categories WHERE book_id = ?1")
        .context("failed to prepare book category lookup")?;

    let ids = stmt
        .query_map([book_id], |row| row.get(0))
        .context("failed to iterate book category ids")?
        .collect::<rusqlite::Result<Vec<i64>>>()
        .context("failed to collect book category ids")?;

    Ok(ids)
}

/// Replace the whole category set for a book. The delete and the inserts run
/// in one transaction so a failure midway cannot leave the book half-linked.
pub fn replace_book_categories(
    conn: &mut Connection,
    book_id: i64,
    category_ids: &[i64],
) -> Result<()> {
    let tx = conn
        .transaction()
        .context("failed to start category transaction")?;

    tx.execute(
        "DELETE FROM book_categories WHERE book_id = ?1",
        params![book_id],
    )
    .context("failed to clear book categories")?;

    for &category_id in category_ids {
        tx.execute(
            "INSERT INTO book_categories (book_id, category_id) VALUES (?1, ?2)",
            params![book_id, category_id],
        )
        .context("failed to link book to category")?;
    }

    tx.commit().context("failed to commit category changes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::open_memory;
    use crate::db::{create_book, create_category};

    #[test]
    fn replace_swaps_the_whole_set() {
        let mut conn = open_memory().unwrap();
        let sf = create_category(&conn, "Science Fiction").unwrap();
        let classics = create_category(&conn, "Classics").unwrap();
        let history = create_category(&conn, "History").unwrap();
        let book = create_book(&conn, "Dune", "Frank Herbert").unwrap();

        replace_book_categories(&mut conn, book.id, &[sf.id, history.id]).unwrap();
        replace_book_categories(&mut conn, book.id, &[classics.id]).unwrap();

        let ids = fetch_category_ids_for_book(&conn, book.id).unwrap();
        assert_eq!(ids, vec![classics.id]);
    }

    #[test]
    fn replace_with_empty_set_unlinks_everything() {
        let mut conn = open_memory().unwrap();
        let sf = create_category(&conn, "Science Fiction").unwrap();
        let book = create_book(&conn, "Dune", "Frank Herbert").unwrap();
        replace_book_categories(&mut conn, book.id, &[sf.id]).unwrap();

        replace_book_categories(&mut conn, book.id, &[]).unwrap();

        assert!(fetch_category_ids_for_book(&conn, book.id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn replace_with_unknown_category_rolls_back() {
        let mut conn = open_memory().unwrap();
        let sf = create_category(&conn, "Science Fiction").unwrap();
        let book = create_book(&conn, "Dune", "Frank Herbert").unwrap();
        replace_book_categories(&mut conn, book.id, &[sf.id]).unwrap();

        // Second id violates the foreign key; the whole replacement must
        // roll back, leaving the original link untouched.
        assert!(replace_book_categories(&mut conn, book.id, &[sf.id, 999]).is_err());
        let ids = fetch_category_ids_for_book(&conn, book.id).unwrap();
        assert_eq!(ids, vec![sf.id]);
    }

    #[test]
    fn full_table_read_sees_links_for_all_books() {
        let mut conn = open_memory().unwrap();
        let sf = create_category(&conn, "Science Fiction").unwrap();
        let dune = create_book(&conn, "Dune", "Frank Herbert").unwrap();
        let eden = create_book(&conn, "Eden", "Stanislaw Lem").unwrap();
        replace_book_categories(&mut conn, dune.id, &[sf.id]).unwrap();
        replace_book_categories(&mut conn, eden.id, &[sf.id]).unwrap();

        let links = fetch_book_categories(&conn).unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|link| link.category_id == sf.id));
    }
}
