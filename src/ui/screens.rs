use std::collections::HashSet;

use anyhow::Result;
use rusqlite::Connection;

use crate::db::{fetch_book_ids_for_user, fetch_categories, fetch_category_ids_for_book};
use crate::models::{Book, BookCategory, BorrowedBook, Category, User};

/// Backing state for the book list. Besides the catalog itself we keep the
/// related tables in memory so category names and borrower names resolve with
/// linear scans, matching the full-table-read data flow used everywhere else.
pub(crate) struct BookScreen {
    pub(crate) books: Vec<Book>,
    pub(crate) categories: Vec<Category>,
    pub(crate) links: Vec<BookCategory>,
    pub(crate) borrows: Vec<BorrowedBook>,
    pub(crate) users: Vec<User>,
    pub(crate) filter_category: Option<i64>,
    pub(crate) filtered_books: Vec<Book>,
    pub(crate) selected: usize,
}

impl BookScreen {
    pub(crate) fn new(
        books: Vec<Book>,
        categories: Vec<Category>,
        links: Vec<BookCategory>,
        borrows: Vec<BorrowedBook>,
        users: Vec<User>,
    ) -> Self {
        let mut screen = Self {
            books,
            categories,
            links,
            borrows,
            users,
            filter_category: None,
            filtered_books: Vec::new(),
            selected: 0,
        };
        screen.apply_filter();
        screen
    }

    /// Narrow the visible list to books linked to the active category. `None`
    /// shows everything.
    pub(crate) fn apply_filter(&mut self) {
        if let Some(category_id) = self.filter_category {
            let linked: HashSet<i64> = self
                .links
                .iter()
                .filter(|link| link.category_id == category_id)
                .map(|link| link.book_id)
                .collect();
            self.filtered_books = self
                .books
                .iter()
                .filter(|book| linked.contains(&book.id))
                .cloned()
                .collect();
        } else {
            self.filtered_books = self.books.clone();
        }

        if self.filtered_books.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.filtered_books.len() {
            self.selected = self.filtered_books.len() - 1;
        }
    }

    pub(crate) fn set_filter_category(&mut self, category_id: Option<i64>) {
        self.filter_category = category_id;
        self.apply_filter();
    }

    /// Human-readable name of the active filter, used in the list title.
    pub(crate) fn filter_category_name(&self) -> Option<String> {
        let id = self.filter_category?;
        self.categories
            .iter()
            .find(|category| category.id == id)
            .map(|category| category.name.clone())
    }

    /// Names of the categories linked to one book, resolved from the
    /// in-memory join rows.
    pub(crate) fn category_names_for(&self, book_id: i64) -> Vec<String> {
        let ids: Vec<i64> = self
            .links
            .iter()
            .filter(|link| link.book_id == book_id)
            .map(|link| link.category_id)
            .collect();

        self.categories
            .iter()
            .filter(|category| ids.contains(&category.id))
            .map(|category| category.name.clone())
            .collect()
    }

    /// The user currently holding the book, if any open loan exists.
    pub(crate) fn borrower_name_for(&self, book_id: i64) -> Option<String> {
        let borrow = self
            .borrows
            .iter()
            .find(|borrow| borrow.book_id == book_id && borrow.is_open())?;
        self.users
            .iter()
            .find(|user| user.id == borrow.user_id)
            .map(|user| user.name.clone())
    }

    /// The open borrow record for a book, used by the "mark returned" flow.
    pub(crate) fn open_borrow_for(&self, book_id: i64) -> Option<&BorrowedBook> {
        self.borrows
            .iter()
            .find(|borrow| borrow.book_id == book_id && borrow.is_open())
    }

    pub(crate) fn current_book(&self) -> Option<&Book> {
        self.filtered_books.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.filtered_books.is_empty() {
            return;
        }
        let len = self.filtered_books.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    pub(crate) fn select_first(&mut self) {
        if !self.filtered_books.is_empty() {
            self.selected = 0;
        }
    }

    pub(crate) fn select_last(&mut self) {
        if !self.filtered_books.is_empty() {
            self.selected = self.filtered_books.len() - 1;
        }
    }

    /// Swap in freshly fetched tables after a mutation, keeping the filter
    /// and clamping the selection.
    pub(crate) fn set_data(
        &mut self,
        books: Vec<Book>,
        categories: Vec<Category>,
        links: Vec<BookCategory>,
        borrows: Vec<BorrowedBook>,
        users: Vec<User>,
    ) {
        self.books = books;
        self.categories = categories;
        self.links = links;
        self.borrows = borrows;
        self.users = users;

        // Drop the filter if its category vanished underneath us.
        if let Some(id) = self.filter_category {
            if !self.categories.iter().any(|category| category.id == id) {
                self.filter_category = None;
            }
        }
        self.apply_filter();
    }
}

/// Backing state for the category list.
pub(crate) struct CategoryScreen {
    pub(crate) categories: Vec<Category>,
    pub(crate) selected: usize,
}

impl CategoryScreen {
    pub(crate) fn new(categories: Vec<Category>) -> Self {
        Self {
            categories,
            selected: 0,
        }
    }

    pub(crate) fn current_category(&self) -> Option<&Category> {
        self.categories.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.categories.is_empty() {
            return;
        }
        let len = self.categories.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    pub(crate) fn select_first(&mut self) {
        if !self.categories.is_empty() {
            self.selected = 0;
        }
    }

    pub(crate) fn select_last(&mut self) {
        if !self.categories.is_empty() {
            self.selected = self.categories.len() - 1;
        }
    }

    pub(crate) fn set_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
        if self.categories.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.categories.len() {
            self.selected = self.categories.len() - 1;
        }
    }
}

/// Backing state for the user list. Book and borrow rows ride along so each
/// card can list the member's open loans.
pub(crate) struct UserScreen {
    pub(crate) users: Vec<User>,
    pub(crate) books: Vec<Book>,
    pub(crate) borrows: Vec<BorrowedBook>,
    pub(crate) selected: usize,
}

impl UserScreen {
    pub(crate) fn new(users: Vec<User>, books: Vec<Book>, borrows: Vec<BorrowedBook>) -> Self {
        Self {
            users,
            books,
            borrows,
            selected: 0,
        }
    }

    /// Titles of the books a user currently has out.
    pub(crate) fn borrowed_titles_for(&self, user_id: i64) -> Vec<String> {
        let ids: Vec<i64> = self
            .borrows
            .iter()
            .filter(|borrow| borrow.user_id == user_id && borrow.is_open())
            .map(|borrow| borrow.book_id)
            .collect();

        self.books
            .iter()
            .filter(|book| ids.contains(&book.id))
            .map(|book| book.name.clone())
            .collect()
    }

    pub(crate) fn current_user(&self) -> Option<&User> {
        self.users.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.users.is_empty() {
            return;
        }
        let len = self.users.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    pub(crate) fn select_first(&mut self) {
        if !self.users.is_empty() {
            self.selected = 0;
        }
    }

    pub(crate) fn select_last(&mut self) {
        if !self.users.is_empty() {
            self.selected = self.users.len() - 1;
        }
    }

    pub(crate) fn set_data(
        &mut self,
        users: Vec<User>,
        books: Vec<Book>,
        borrows: Vec<BorrowedBook>,
    ) {
        self.users = users;
        self.books = books;
        self.borrows = borrows;
        if self.users.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.users.len() {
            self.selected = self.users.len() - 1;
        }
    }
}

/// The book mutation waiting on the category picker. Create keeps the typed
/// fields; Edit also carries the id being updated.
pub(crate) enum PendingBook {
    Create { name: String, author: String },
    Edit { id: i64, name: String, author: String },
}

/// Backing state for the category multi-select shown after the book form.
pub(crate) struct CategoryPickState {
    pub(crate) pending: PendingBook,
    pub(crate) categories: Vec<Category>,
    pub(crate) checked: HashSet<i64>,
    pub(crate) selected: usize,
}

impl CategoryPickState {
    /// Picker for a brand new book; nothing is pre-checked.
    pub(crate) fn for_create(conn: &Connection, name: String, author: String) -> Result<Self> {
        let categories = fetch_categories(conn)?;
        Ok(Self {
            pending: PendingBook::Create { name, author },
            categories,
            checked: HashSet::new(),
            selected: 0,
        })
    }

    /// Picker for an existing book, pre-checked with its current links.
    pub(crate) fn for_edit(
        conn: &Connection,
        id: i64,
        name: String,
        author: String,
    ) -> Result<Self> {
        let categories = fetch_categories(conn)?;
        let checked = fetch_category_ids_for_book(conn, id)?.into_iter().collect();
        Ok(Self {
            pending: PendingBook::Edit { id, name, author },
            categories,
            checked,
            selected: 0,
        })
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.categories.is_empty() {
            return;
        }
        let len = self.categories.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    pub(crate) fn toggle_current(&mut self) {
        if let Some(category) = self.categories.get(self.selected) {
            if !self.checked.remove(&category.id) {
                self.checked.insert(category.id);
            }
        }
    }

    pub(crate) fn is_checked(&self, index: usize) -> bool {
        matches!(
            self.categories.get(index),
            Some(category) if self.checked.contains(&category.id)
        )
    }

    /// The ids to persist, in the display order of the list.
    pub(crate) fn checked_ids(&self) -> Vec<i64> {
        self.categories
            .iter()
            .filter(|category| self.checked.contains(&category.id))
            .map(|category| category.id)
            .collect()
    }
}

/// Backing state for the borrow multi-select shown after the user edit form.
pub(crate) struct BorrowPickState {
    pub(crate) user_id: i64,
    pub(crate) user_name: String,
    pub(crate) books: Vec<Book>,
    pub(crate) checked: HashSet<i64>,
    pub(crate) selected: usize,
}

impl BorrowPickState {
    /// Picker listing the whole catalog, pre-checked with the user's open
    /// loans.
    pub(crate) fn load(
        conn: &Connection,
        user_id: i64,
        user_name: String,
        books: Vec<Book>,
    ) -> Result<Self> {
        let checked = fetch_book_ids_for_user(conn, user_id)?.into_iter().collect();
        Ok(Self {
            user_id,
            user_name,
            books,
            checked,
            selected: 0,
        })
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.books.is_empty() {
            return;
        }
        let len = self.books.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    pub(crate) fn toggle_current(&mut self) {
        if let Some(book) = self.books.get(self.selected) {
            if !self.checked.remove(&book.id) {
                self.checked.insert(book.id);
            }
        }
    }

    pub(crate) fn is_checked(&self, index: usize) -> bool {
        matches!(
            self.books.get(index),
            Some(book) if self.checked.contains(&book.id)
        )
    }

    pub(crate) fn checked_ids(&self) -> Vec<i64> {
        self.books
            .iter()
            .filter(|book| self.checked.contains(&book.id))
            .map(|book| book.id)
            .collect()
    }
}

/// Backing state for the category filter palette on the book list. Index 0 is
/// the "All" entry; every following row is a category.
pub(crate) struct CategoryFilterState {
    pub(crate) categories: Vec<Category>,
    pub(crate) selected: usize,
}

impl CategoryFilterState {
    pub(crate) fn new(categories: Vec<Category>, active: Option<i64>) -> Self {
        let selected = active
            .and_then(|id| categories.iter().position(|category| category.id == id))
            .map(|idx| idx + 1)
            .unwrap_or(0);
        Self {
            categories,
            selected,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.categories.len() + 1
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        let len = self.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    /// Resolve the highlighted row to a filter value. Row 0 clears the
    /// filter.
    pub(crate) fn selection_to_filter(&self) -> Option<i64> {
        if self.selected == 0 {
            None
        } else {
            self.categories
                .get(self.selected - 1)
                .map(|category| category.id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_books() -> Vec<Book> {
        vec![
            Book {
                id: 1,
                name: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
            },
            Book {
                id: 2,
                name: "SPQR".to_string(),
                author: "Mary Beard".to_string(),
            },
        ]
    }

    fn sample_categories() -> Vec<Category> {
        vec![
            Category {
                id: 10,
                name: "History".to_string(),
            },
            Category {
                id: 11,
                name: "Science Fiction".to_string(),
            },
        ]
    }

    fn screen_with_links() -> BookScreen {
        let links = vec![
            BookCategory {
                id: 1,
                book_id: 1,
                category_id: 11,
            },
            BookCategory {
                id: 2,
                book_id: 2,
                category_id: 10,
            },
        ];
        BookScreen::new(
            sample_books(),
            sample_categories(),
            links,
            Vec::new(),
            Vec::new(),
        )
    }

    #[test]
    fn category_filter_narrows_the_list() {
        let mut screen = screen_with_links();
        assert_eq!(screen.filtered_books.len(), 2);

        screen.set_filter_category(Some(11));
        assert_eq!(screen.filtered_books.len(), 1);
        assert_eq!(screen.filtered_books[0].name, "Dune");
        assert_eq!(
            screen.filter_category_name().as_deref(),
            Some("Science Fiction")
        );

        screen.set_filter_category(None);
        assert_eq!(screen.filtered_books.len(), 2);
    }

    #[test]
    fn category_names_resolve_from_join_rows() {
        let screen = screen_with_links();
        assert_eq!(screen.category_names_for(2), vec!["History".to_string()]);
        assert!(screen.category_names_for(99).is_empty());
    }

    #[test]
    fn borrower_name_ignores_returned_loans() {
        let users = vec![User {
            id: 5,
            name: "Ada".to_string(),
            telephone: "555".to_string(),
            address: "12 Crescent Rd".to_string(),
        }];
        let date = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let borrows = vec![
            BorrowedBook {
                id: 1,
                user_id: 5,
                book_id: 1,
                borrow_date: date,
                return_date: None,
            },
            BorrowedBook {
                id: 2,
                user_id: 5,
                book_id: 2,
                borrow_date: date,
                return_date: Some(date),
            },
        ];
        let screen = BookScreen::new(
            sample_books(),
            sample_categories(),
            Vec::new(),
            borrows,
            users,
        );

        assert_eq!(screen.borrower_name_for(1).as_deref(), Some("Ada"));
        assert!(screen.borrower_name_for(2).is_none());
    }

    #[test]
    fn stale_filter_is_dropped_on_refresh() {
        let mut screen = screen_with_links();
        screen.set_filter_category(Some(11));

        // Refresh without the Science Fiction category.
        screen.set_data(
            sample_books(),
            vec![Category {
                id: 10,
                name: "History".to_string(),
            }],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );

        assert!(screen.filter_category.is_none());
        assert_eq!(screen.filtered_books.len(), 2);
    }

    #[test]
    fn user_screen_lists_open_loans_only() {
        let users = vec![User {
            id: 5,
            name: "Ada".to_string(),
            telephone: "555".to_string(),
            address: "12 Crescent Rd".to_string(),
        }];
        let date = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let borrows = vec![
            BorrowedBook {
                id: 1,
                user_id: 5,
                book_id: 1,
                borrow_date: date,
                return_date: None,
            },
            BorrowedBook {
                id: 2,
                user_id: 5,
                book_id: 2,
                borrow_date: date,
                return_date: Some(date),
            },
        ];
        let screen = UserScreen::new(users, sample_books(), borrows);
        assert_eq!(screen.borrowed_titles_for(5), vec!["Dune".to_string()]);
    }

    #[test]
    fn filter_palette_maps_rows_to_categories() {
        let mut state = CategoryFilterState::new(sample_categories(), Some(11));
        assert_eq!(state.selected, 2);
        assert_eq!(state.selection_to_filter(), Some(11));

        state.move_selection(-2);
        assert_eq!(state.selected, 0);
        assert_eq!(state.selection_to_filter(), None);
    }

    #[test]
    fn selection_clamps_at_both_ends() {
        let mut screen = CategoryScreen::new(sample_categories());
        screen.move_selection(-3);
        assert_eq!(screen.selected, 0);
        screen.move_selection(10);
        assert_eq!(screen.selected, 1);
    }
}
