//! Persistence module split across logical submodules, one per table.

mod book_categories;
mod books;
mod borrows;
mod categories;
mod connection;
mod users;

use thiserror::Error;

/// Typed failures carried at the root of anyhow chains so the footer status
/// line can show a friendly message. Everything else travels as an `anyhow`
/// chain with call-site context.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
}

pub use book_categories::{
    fetch_book_categories, fetch_category_ids_for_book, replace_book_categories,
};
pub use books::{
    create_book, delete_book, fetch_books, fetch_books_in_category, update_book,
};
pub use borrows::{
    borrowed_count_for_user, fetch_book_ids_for_user, fetch_borrowed_books,
    replace_user_borrows, return_borrowed_book,
};
pub use categories::{create_category, delete_category, fetch_categories, update_category};
pub use connection::{create_tables, ensure_schema};
pub use users::{create_user, delete_user, fetch_users, update_user};
