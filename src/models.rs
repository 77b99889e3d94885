//! Domain models that mirror the SQLite schema and get passed throughout the
//! TUI. The intent is that these types stay light-weight data holders so other
//! layers can focus on presentation and persistence logic.

use std::fmt;

use chrono::NaiveDate;

#[derive(Debug, Clone)]
/// A library member who can borrow books. Contact details are free-form text
/// entered through the user form.
pub struct User {
    /// Primary key from the database. Edit/delete flows bubble the id back to
    /// the persistence layer even though lists only show display fields.
    pub id: i64,
    pub name: String,
    pub telephone: String,
    pub address: String,
}

#[derive(Debug, Clone)]
/// A shelf category. Books link to categories through the join table rather
/// than holding a category column themselves.
pub struct Category {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for Category {
    /// Write the category name to any formatter. Display is implemented so the
    /// type plays nicely with Ratatui widgets that consume strings implicitly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone)]
/// In-memory representation of a book row.
pub struct Book {
    pub id: i64,
    pub name: String,
    pub author: String,
}

impl Book {
    /// Compose a `Title - Author` string that gracefully omits the hyphen if
    /// the author is blank. List views and pickers rely on this ready-to-use
    /// formatting.
    pub fn display_title(&self) -> String {
        if self.author.trim().is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", self.name, self.author)
        }
    }
}

#[derive(Debug, Clone)]
/// Join-table row linking one book to one category.
pub struct BookCategory {
    pub id: i64,
    pub book_id: i64,
    pub category_id: i64,
}

#[derive(Debug, Clone)]
/// Borrow record associating one user with one book. A row with no return
/// date is an open loan; a stamped return date means the book is back on the
/// shelf.
pub struct BorrowedBook {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub borrow_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

impl BorrowedBook {
    /// Whether the book is still out with the user.
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }
}
