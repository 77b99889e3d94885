//! Core library surface for the Home Library Manager TUI application.
//!
//! The public modules exposed here provide an intentionally small API so the
//! `bin` target as well as potential external tooling can reuse the same
//! pieces: the SQLite persistence layer, the domain types, and the interactive
//! application loop.
pub mod db;
pub mod models;
pub mod ui;

/// Convenience re-export for the persistence layer; `main.rs` uses it to
/// initialize the embedded SQLite store.
pub use db::ensure_schema;

/// The domain types other layers manipulate.
pub use models::{Book, BookCategory, BorrowedBook, Category, User};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
