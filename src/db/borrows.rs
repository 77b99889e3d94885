use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rusqlite::{params, Connection};

use super::StoreError;
use crate::models::BorrowedBook;

/// Full borrow-table read, newest loans first. Screens keep these rows in
/// memory and resolve user/book names with linear scans.
pub fn fetch_borrowed_books(conn: &Connection) -> Result<Vec<BorrowedBook>> {
    let mut stmt = conn
        .prepare(
            "SELECT borrowed_book_id, customer_id, book_id, borrow_date, return_date
             FROM borrowed_books
             ORDER BY borrow_date DESC, borrowed_book_id DESC",
        )
        .context("failed to prepare borrow query")?;

    let borrows = stmt
        .query_map([], |row| {
            Ok(BorrowedBook {
                id: row.get(0)?,
                user_id: row.get(1)?,
                book_id: row.get(2)?,
                borrow_date: row.get(3)?,
                return_date: row.get(4)?,
            })
        })
        .context("failed to iterate borrows")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect borrows")?;

    Ok(borrows)
}

/// Ids of the books a user currently has out, used to pre-check the borrow
/// picker when editing a user. Returned loans do not count.
pub fn fetch_book_ids_for_user(conn: &Connection, user_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn
        .prepare(
            "SELECT book_id FROM borrowed_books
             WHERE customer_id = ?1 AND return_date IS NULL",
        )
        .context("failed to prepare user borrow lookup")?;

    let ids = stmt
        .query_map([user_id], |row| row.get(0))
        .context("failed to iterate user borrow ids")?
        .collect::<rusqlite::Result<Vec<i64>>>()
        .context("failed to collect user borrow ids")?;

    Ok(ids)
}

/// How many books a user currently has out.
pub fn borrowed_count_for_user(conn: &Connection, user_id: i64) -> Result<usize> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM borrowed_books
             WHERE customer_id = ?1 AND return_date IS NULL",
            params![user_id],
            |row| row.get(0),
        )
        .context("failed to count user borrows")?;
    Ok(count as usize)
}

/// Replace the set of books a user has out. A book can only be borrowed by
/// one user at a time, so besides clearing the user's own open loans we also
/// clear any other user's open loan on the selected books before inserting
/// fresh rows dated today. Returned loans stay behind as history. Everything
/// runs in one transaction so a failure midway cannot strand a book between
/// two borrowers.
pub fn replace_user_borrows(conn: &mut Connection, user_id: i64, book_ids: &[i64]) -> Result<()> {
    let today = Local::now().date_naive();
    let tx = conn
        .transaction()
        .context("failed to start borrow transaction")?;

    tx.execute(
        "DELETE FROM borrowed_books WHERE customer_id = ?1 AND return_date IS NULL",
        params![user_id],
    )
    .context("failed to clear user borrows")?;

    for &book_id in book_ids {
        tx.execute(
            "DELETE FROM borrowed_books WHERE book_id = ?1 AND return_date IS NULL",
            params![book_id],
        )
        .context("failed to release book from previous borrower")?;

        tx.execute(
            "INSERT INTO borrowed_books (customer_id, book_id, borrow_date, return_date)
             VALUES (?1, ?2, ?3, NULL)",
            params![user_id, book_id, today],
        )
        .context("failed to insert borrow record")?;
    }

    tx.commit().context("failed to commit borrow changes")
}

/// Stamp an open loan with today's date. The row stays behind as history;
/// only open loans block a book from being borrowed again.
pub fn return_borrowed_book(conn: &Connection, borrow_id: i64) -> Result<NaiveDate> {
    let today = Local::now().date_naive();
    let updated = conn
        .execute(
            "UPDATE borrowed_books SET return_date = ?1
             WHERE borrowed_book_id = ?2 AND return_date IS NULL",
            params![today, borrow_id],
        )
        .context("failed to mark book returned")?;

    if updated == 0 {
        Err(StoreError::NotFound {
            entity: "Open borrow record",
        }
        .into())
    } else {
        Ok(today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::open_memory;
    use crate::db::{create_book, create_user};

    #[test]
    fn replace_records_open_loans_dated_today() {
        let mut conn = open_memory().unwrap();
        let user = create_user(&conn, "Ada", "555-0100", "12 Crescent Rd").unwrap();
        let book = create_book(&conn, "Dune", "Frank Herbert").unwrap();

        replace_user_borrows(&mut conn, user.id, &[book.id]).unwrap();

        let borrows = fetch_borrowed_books(&conn).unwrap();
        assert_eq!(borrows.len(), 1);
        assert_eq!(borrows[0].user_id, user.id);
        assert_eq!(borrows[0].book_id, book.id);
        assert_eq!(borrows[0].borrow_date, Local::now().date_naive());
        assert!(borrows[0].is_open());
    }

    #[test]
    fn replace_takes_the_book_from_the_previous_borrower() {
        let mut conn = open_memory().unwrap();
        let ada = create_user(&conn, "Ada", "555-0100", "12 Crescent Rd").unwrap();
        let ben = create_user(&conn, "Ben", "555-0200", "3 Hill St").unwrap();
        let book = create_book(&conn, "Dune", "Frank Herbert").unwrap();

        replace_user_borrows(&mut conn, ada.id, &[book.id]).unwrap();
        replace_user_borrows(&mut conn, ben.id, &[book.id]).unwrap();

        let borrows = fetch_borrowed_books(&conn).unwrap();
        assert_eq!(borrows.len(), 1);
        assert_eq!(borrows[0].user_id, ben.id);
        assert!(fetch_book_ids_for_user(&conn, ada.id).unwrap().is_empty());
    }

    #[test]
    fn replace_with_empty_set_clears_the_users_loans() {
        let mut conn = open_memory().unwrap();
        let user = create_user(&conn, "Ada", "555-0100", "12 Crescent Rd").unwrap();
        let book = create_book(&conn, "Dune", "Frank Herbert").unwrap();
        replace_user_borrows(&mut conn, user.id, &[book.id]).unwrap();

        replace_user_borrows(&mut conn, user.id, &[]).unwrap();

        assert_eq!(borrowed_count_for_user(&conn, user.id).unwrap(), 0);
    }

    #[test]
    fn replace_with_unknown_book_rolls_back() {
        let mut conn = open_memory().unwrap();
        let user = create_user(&conn, "Ada", "555-0100", "12 Crescent Rd").unwrap();
        let book = create_book(&conn, "Dune", "Frank Herbert").unwrap();
        replace_user_borrows(&mut conn, user.id, &[book.id]).unwrap();
        let before = fetch_borrowed_books(&conn).unwrap();

        // Second id violates the foreign key; the whole replacement must
        // roll back, leaving the existing open loan untouched.
        assert!(replace_user_borrows(&mut conn, user.id, &[book.id, 999]).is_err());

        let after = fetch_borrowed_books(&conn).unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, before[0].id);
        assert_eq!(after[0].user_id, user.id);
        assert_eq!(after[0].book_id, book.id);
        assert!(after[0].is_open());
    }

    #[test]
    fn returning_stamps_the_date_and_keeps_the_row() {
        let mut conn = open_memory().unwrap();
        let user = create_user(&conn, "Ada", "555-0100", "12 Crescent Rd").unwrap();
        let book = create_book(&conn, "Dune", "Frank Herbert").unwrap();
        replace_user_borrows(&mut conn, user.id, &[book.id]).unwrap();
        let borrow_id = fetch_borrowed_books(&conn).unwrap()[0].id;

        let returned_on = return_borrowed_book(&conn, borrow_id).unwrap();

        let borrows = fetch_borrowed_books(&conn).unwrap();
        assert_eq!(borrows.len(), 1);
        assert_eq!(borrows[0].return_date, Some(returned_on));
        assert!(fetch_book_ids_for_user(&conn, user.id).unwrap().is_empty());
    }

    #[test]
    fn returning_twice_errors() {
        let mut conn = open_memory().unwrap();
        let user = create_user(&conn, "Ada", "555-0100", "12 Crescent Rd").unwrap();
        let book = create_book(&conn, "Dune", "Frank Herbert").unwrap();
        replace_user_borrows(&mut conn, user.id, &[book.id]).unwrap();
        let borrow_id = fetch_borrowed_books(&conn).unwrap()[0].id;

        return_borrowed_book(&conn, borrow_id).unwrap();
        assert!(return_borrowed_book(&conn, borrow_id).is_err());
    }

    #[test]
    fn count_ignores_returned_loans() {
        let mut conn = open_memory().unwrap();
        let user = create_user(&conn, "Ada", "555-0100", "12 Crescent Rd").unwrap();
        let dune = create_book(&conn, "Dune", "Frank Herbert").unwrap();
        let eden = create_book(&conn, "Eden", "Stanislaw Lem").unwrap();
        replace_user_borrows(&mut conn, user.id, &[dune.id, eden.id]).unwrap();

        let borrow_id = fetch_borrowed_books(&conn)
            .unwrap()
            .iter()
            .find(|b| b.book_id == dune.id)
            .unwrap()
            .id;
        return_borrowed_book(&conn, borrow_id).unwrap();

        assert_eq!(borrowed_count_for_user(&conn, user.id).unwrap(), 1);
    }
}
