use std::cmp::min;
use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use rusqlite::Connection;

use crate::db::{
    create_book, create_category, create_user, delete_book, delete_category, delete_user,
    fetch_book_categories, fetch_books, fetch_borrowed_books, fetch_categories, fetch_users,
    replace_book_categories, replace_user_borrows, return_borrowed_book, update_book,
    update_category, update_user,
};

use super::forms::{
    BookField, BookForm, CategoryForm, ConfirmBookDelete, ConfirmCategoryDelete,
    ConfirmUserDelete, UserField, UserForm,
};
use super::helpers::{centered_rect, comma_list, surface_error};
use super::screens::{
    BookScreen, BorrowPickState, CategoryFilterState, CategoryPickState, CategoryScreen,
    PendingBook, UserScreen,
};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Height allocation per book card in the list view.
const BOOK_CARD_HEIGHT: u16 = 6;
/// Height allocation per user card in the list view.
const USER_CARD_HEIGHT: u16 = 6;

/// High-level navigation states. Keeping this explicit makes it easy to reason
/// about which rendering path runs and what keyboard shortcuts should do.
enum Screen {
    Books(BookScreen),
    Categories(CategoryScreen),
    Users(UserScreen),
}

/// Fine-grained modes scoped to the current screen.
enum Mode {
    Normal,
    AddingBook(BookForm),
    EditingBook {
        id: i64,
        form: BookForm,
    },
    PickingCategories(CategoryPickState),
    ConfirmBookDelete(ConfirmBookDelete),
    FilteringBooks(CategoryFilterState),
    AddingCategory(CategoryForm),
    EditingCategory {
        id: i64,
        form: CategoryForm,
    },
    ConfirmCategoryDelete(ConfirmCategoryDelete),
    AddingUser(UserForm),
    EditingUser {
        id: i64,
        form: UserForm,
    },
    PickingBorrows(BorrowPickState),
    ConfirmUserDelete(ConfirmUserDelete),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    conn: Connection,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    /// Hydrate the book list from the database and start on it.
    pub fn new(conn: Connection) -> Result<Self> {
        let screen = Screen::Books(load_book_screen(&conn)?);
        Ok(Self {
            conn,
            screen,
            mode: Mode::Normal,
            status: None,
        })
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::AddingBook(form) => self.handle_add_book(code, form)?,
            Mode::EditingBook { id, form } => self.handle_edit_book(code, id, form)?,
            Mode::PickingCategories(state) => self.handle_pick_categories(code, state)?,
            Mode::ConfirmBookDelete(confirm) => self.handle_confirm_book_delete(code, confirm)?,
            Mode::FilteringBooks(state) => self.handle_filter_books(code, state)?,
            Mode::AddingCategory(form) => self.handle_add_category(code, form)?,
            Mode::EditingCategory { id, form } => self.handle_edit_category(code, id, form)?,
            Mode::ConfirmCategoryDelete(confirm) => {
                self.handle_confirm_category_delete(code, confirm)?
            }
            Mode::AddingUser(form) => self.handle_add_user(code, form)?,
            Mode::EditingUser { id, form } => self.handle_edit_user(code, id, form)?,
            Mode::PickingBorrows(state) => self.handle_pick_borrows(code, state)?,
            Mode::ConfirmUserDelete(confirm) => self.handle_confirm_user_delete(code, confirm)?,
        };

        self.mode = mode;
        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match self.screen {
            Screen::Books(ref mut books) => {
                let mut status_to_set: Option<(String, StatusKind)> = None;
                let mut open_categories = false;
                let mut open_users = false;
                let mut return_borrow: Option<(i64, String)> = None;

                {
                    let books = &mut *books;
                    match code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            *exit = true;
                        }
                        KeyCode::Up => books.move_selection(-1),
                        KeyCode::Down => books.move_selection(1),
                        KeyCode::PageUp => books.move_selection(-5),
                        KeyCode::PageDown => books.move_selection(5),
                        KeyCode::Home => books.select_first(),
                        KeyCode::End => books.select_last(),
                        KeyCode::Char('c') | KeyCode::Char('C') => {
                            open_categories = true;
                        }
                        KeyCode::Char('u') | KeyCode::Char('U') => {
                            open_users = true;
                        }
                        KeyCode::Char('f') | KeyCode::Char('F') => {
                            return Ok(Mode::FilteringBooks(CategoryFilterState::new(
                                books.categories.clone(),
                                books.filter_category,
                            )));
                        }
                        KeyCode::Char('+') => {
                            if books.categories.is_empty() {
                                status_to_set = Some((
                                    "Create a category first.".to_string(),
                                    StatusKind::Error,
                                ));
                            } else {
                                return Ok(Mode::AddingBook(BookForm::default()));
                            }
                        }
                        KeyCode::Char('-') => {
                            if let Some(book) = books.current_book().cloned() {
                                return Ok(Mode::ConfirmBookDelete(ConfirmBookDelete::from(book)));
                            } else {
                                status_to_set = Some((
                                    "No book selected to delete.".to_string(),
                                    StatusKind::Error,
                                ));
                            }
                        }
                        KeyCode::Char('e') | KeyCode::Char('E') => {
                            if let Some(book) = books.current_book().cloned() {
                                return Ok(Mode::EditingBook {
                                    id: book.id,
                                    form: BookForm::from_book(&book),
                                });
                            } else {
                                status_to_set = Some((
                                    "No book selected to edit.".to_string(),
                                    StatusKind::Error,
                                ));
                            }
                        }
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            if let Some(book) = books.current_book().cloned() {
                                if let Some(borrow) = books.open_borrow_for(book.id) {
                                    return_borrow = Some((borrow.id, book.name.clone()));
                                } else {
                                    status_to_set = Some((
                                        format!("'{}' is not on loan.", book.name),
                                        StatusKind::Error,
                                    ));
                                }
                            } else {
                                status_to_set = Some((
                                    "No book selected to return.".to_string(),
                                    StatusKind::Error,
                                ));
                            }
                        }
                        _ => {}
                    }
                }

                if let Some((borrow_id, book_name)) = return_borrow {
                    match return_borrowed_book(&self.conn, borrow_id) {
                        Ok(_) => {
                            self.refresh_book_screen()?;
                            self.set_status(
                                format!("Marked '{book_name}' as returned."),
                                StatusKind::Info,
                            );
                        }
                        Err(err) => {
                            let message = surface_error(&err);
                            self.set_status(message, StatusKind::Error);
                        }
                    }
                } else if open_categories {
                    self.clear_status();
                    self.open_categories()?;
                } else if open_users {
                    self.clear_status();
                    self.open_users()?;
                } else if let Some((text, kind)) = status_to_set {
                    self.set_status(text, kind);
                }

                Ok(Mode::Normal)
            }
            Screen::Categories(ref mut categories) => {
                let mut status_to_set: Option<(String, StatusKind)> = None;
                let mut open_books = false;
                let mut open_users = false;

                {
                    let categories = &mut *categories;
                    match code {
                        KeyCode::Char('q') => {
                            *exit = true;
                        }
                        KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('B') => {
                            open_books = true;
                        }
                        KeyCode::Char('u') | KeyCode::Char('U') => {
                            open_users = true;
                        }
                        KeyCode::Up => categories.move_selection(-1),
                        KeyCode::Down => categories.move_selection(1),
                        KeyCode::PageUp => categories.move_selection(-5),
                        KeyCode::PageDown => categories.move_selection(5),
                        KeyCode::Home => categories.select_first(),
                        KeyCode::End => categories.select_last(),
                        KeyCode::Char('+') => {
                            return Ok(Mode::AddingCategory(CategoryForm::default()));
                        }
                        KeyCode::Char('-') => {
                            if let Some(category) = categories.current_category().cloned() {
                                return Ok(Mode::ConfirmCategoryDelete(
                                    ConfirmCategoryDelete::from(category),
                                ));
                            } else {
                                status_to_set = Some((
                                    "No category selected to delete.".to_string(),
                                    StatusKind::Error,
                                ));
                            }
                        }
                        KeyCode::Char('e') | KeyCode::Char('E') => {
                            if let Some(category) = categories.current_category().cloned() {
                                return Ok(Mode::EditingCategory {
                                    id: category.id,
                                    form: CategoryForm::from_category(&category),
                                });
                            } else {
                                status_to_set = Some((
                                    "No category selected to edit.".to_string(),
                                    StatusKind::Error,
                                ));
                            }
                        }
                        _ => {}
                    }
                }

                if open_books {
                    self.clear_status();
                    self.open_books()?;
                } else if open_users {
                    self.clear_status();
                    self.open_users()?;
                } else if let Some((text, kind)) = status_to_set {
                    self.set_status(text, kind);
                }

                Ok(Mode::Normal)
            }
            Screen::Users(ref mut users) => {
                let mut status_to_set: Option<(String, StatusKind)> = None;
                let mut open_books = false;
                let mut open_categories = false;
                let mut open_borrows_for: Option<(i64, String)> = None;

                {
                    let users = &mut *users;
                    match code {
                        KeyCode::Char('q') => {
                            *exit = true;
                        }
                        KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('B') => {
                            open_books = true;
                        }
                        KeyCode::Char('c') | KeyCode::Char('C') => {
                            open_categories = true;
                        }
                        KeyCode::Up => users.move_selection(-1),
                        KeyCode::Down => users.move_selection(1),
                        KeyCode::PageUp => users.move_selection(-5),
                        KeyCode::PageDown => users.move_selection(5),
                        KeyCode::Home => users.select_first(),
                        KeyCode::End => users.select_last(),
                        KeyCode::Enter => {
                            if let Some(user) = users.current_user().cloned() {
                                open_borrows_for = Some((user.id, user.name));
                            } else {
                                status_to_set =
                                    Some(("No user selected.".to_string(), StatusKind::Error));
                            }
                        }
                        KeyCode::Char('+') => {
                            return Ok(Mode::AddingUser(UserForm::default()));
                        }
                        KeyCode::Char('-') => {
                            if let Some(user) = users.current_user().cloned() {
                                return Ok(Mode::ConfirmUserDelete(ConfirmUserDelete::from(user)));
                            } else {
                                status_to_set = Some((
                                    "No user selected to delete.".to_string(),
                                    StatusKind::Error,
                                ));
                            }
                        }
                        KeyCode::Char('e') | KeyCode::Char('E') => {
                            if let Some(user) = users.current_user().cloned() {
                                return Ok(Mode::EditingUser {
                                    id: user.id,
                                    form: UserForm::from_user(&user),
                                });
                            } else {
                                status_to_set = Some((
                                    "No user selected to edit.".to_string(),
                                    StatusKind::Error,
                                ));
                            }
                        }
                        _ => {}
                    }
                }

                if let Some((user_id, user_name)) = open_borrows_for {
                    self.clear_status();
                    let books = fetch_books(&self.conn)?;
                    if books.is_empty() {
                        self.set_status("No books to lend yet.", StatusKind::Error);
                        return Ok(Mode::Normal);
                    }
                    let state = BorrowPickState::load(&self.conn, user_id, user_name, books)?;
                    return Ok(Mode::PickingBorrows(state));
                }

                if open_books {
                    self.clear_status();
                    self.open_books()?;
                } else if open_categories {
                    self.clear_status();
                    self.open_categories()?;
                } else if let Some((text, kind)) = status_to_set {
                    self.set_status(text, kind);
                }

                Ok(Mode::Normal)
            }
        }
    }

    fn handle_add_book(&mut self, code: KeyCode, mut form: BookForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Add book cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Tab | KeyCode::BackTab => {
                form.toggle_field();
                Ok(Mode::AddingBook(form))
            }
            KeyCode::Backspace => {
                form.backspace();
                Ok(Mode::AddingBook(form))
            }
            KeyCode::Enter => match form.parse_inputs() {
                Ok((name, author)) => {
                    let state = CategoryPickState::for_create(&self.conn, name, author)?;
                    Ok(Mode::PickingCategories(state))
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                    Ok(Mode::AddingBook(form))
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
                Ok(Mode::AddingBook(form))
            }
            _ => Ok(Mode::AddingBook(form)),
        }
    }

    fn handle_edit_book(&mut self, code: KeyCode, id: i64, mut form: BookForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Tab | KeyCode::BackTab => {
                form.toggle_field();
                Ok(Mode::EditingBook { id, form })
            }
            KeyCode::Backspace => {
                form.backspace();
                Ok(Mode::EditingBook { id, form })
            }
            KeyCode::Enter => match form.parse_inputs() {
                Ok((name, author)) => {
                    let state = CategoryPickState::for_edit(&self.conn, id, name, author)?;
                    Ok(Mode::PickingCategories(state))
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                    Ok(Mode::EditingBook { id, form })
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
                Ok(Mode::EditingBook { id, form })
            }
            _ => Ok(Mode::EditingBook { id, form }),
        }
    }

    fn handle_pick_categories(&mut self, code: KeyCode, mut state: CategoryPickState) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Book save cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Up => {
                state.move_selection(-1);
                Ok(Mode::PickingCategories(state))
            }
            KeyCode::Down => {
                state.move_selection(1);
                Ok(Mode::PickingCategories(state))
            }
            KeyCode::PageUp => {
                state.move_selection(-5);
                Ok(Mode::PickingCategories(state))
            }
            KeyCode::PageDown => {
                state.move_selection(5);
                Ok(Mode::PickingCategories(state))
            }
            KeyCode::Char(' ') => {
                state.toggle_current();
                Ok(Mode::PickingCategories(state))
            }
            KeyCode::Enter => {
                let ids = state.checked_ids();
                if ids.is_empty() {
                    self.set_status("Select at least one category.", StatusKind::Error);
                    return Ok(Mode::PickingCategories(state));
                }

                let result = match &state.pending {
                    PendingBook::Create { name, author } => self.save_new_book(name, author, &ids),
                    PendingBook::Edit { id, name, author } => {
                        self.save_existing_book(*id, name, author, &ids)
                    }
                };

                match result {
                    Ok(message) => {
                        self.refresh_book_screen()?;
                        self.set_status(message, StatusKind::Info);
                        Ok(Mode::Normal)
                    }
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::PickingCategories(state))
                    }
                }
            }
            _ => Ok(Mode::PickingCategories(state)),
        }
    }

    fn handle_confirm_book_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmBookDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match delete_book(&self.conn, confirm.id) {
                    Ok(_) => {
                        self.refresh_book_screen()?;
                        self.set_status(format!("Deleted '{}'.", confirm.name), StatusKind::Info);
                        Ok(Mode::Normal)
                    }
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::ConfirmBookDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmBookDelete(confirm)),
        }
    }

    fn handle_filter_books(&mut self, code: KeyCode, mut state: CategoryFilterState) -> Result<Mode> {
        match code {
            KeyCode::Esc => Ok(Mode::Normal),
            KeyCode::Up => {
                state.move_selection(-1);
                Ok(Mode::FilteringBooks(state))
            }
            KeyCode::Down => {
                state.move_selection(1);
                Ok(Mode::FilteringBooks(state))
            }
            KeyCode::Home => {
                state.move_selection(-(state.len() as isize));
                Ok(Mode::FilteringBooks(state))
            }
            KeyCode::End => {
                state.move_selection(state.len() as isize);
                Ok(Mode::FilteringBooks(state))
            }
            KeyCode::Enter => {
                let filter = state.selection_to_filter();
                let message = if let Screen::Books(ref mut books) = self.screen {
                    books.set_filter_category(filter);
                    match books.filter_category_name() {
                        Some(name) => format!("Showing '{name}' books."),
                        None => "Showing all books.".to_string(),
                    }
                } else {
                    return Ok(Mode::Normal);
                };
                self.set_status(message, StatusKind::Info);
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::FilteringBooks(state)),
        }
    }

    fn handle_add_category(&mut self, code: KeyCode, mut form: CategoryForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Add category cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Backspace => {
                form.backspace();
                Ok(Mode::AddingCategory(form))
            }
            KeyCode::Enter => match form.parse_inputs() {
                Ok(name) => match create_category(&self.conn, &name) {
                    Ok(category) => {
                        self.refresh_category_screen()?;
                        self.set_status(format!("Added '{}'.", category.name), StatusKind::Info);
                        Ok(Mode::Normal)
                    }
                    Err(err) => {
                        let message = surface_error(&err);
                        form.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::AddingCategory(form))
                    }
                },
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                    Ok(Mode::AddingCategory(form))
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
                Ok(Mode::AddingCategory(form))
            }
            _ => Ok(Mode::AddingCategory(form)),
        }
    }

    fn handle_edit_category(
        &mut self,
        code: KeyCode,
        id: i64,
        mut form: CategoryForm,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Backspace => {
                form.backspace();
                Ok(Mode::EditingCategory { id, form })
            }
            KeyCode::Enter => match form.parse_inputs() {
                Ok(name) => match update_category(&self.conn, id, &name) {
                    Ok(_) => {
                        self.refresh_category_screen()?;
                        self.set_status(format!("Renamed to '{name}'."), StatusKind::Info);
                        Ok(Mode::Normal)
                    }
                    Err(err) => {
                        let message = surface_error(&err);
                        form.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::EditingCategory { id, form })
                    }
                },
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                    Ok(Mode::EditingCategory { id, form })
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
                Ok(Mode::EditingCategory { id, form })
            }
            _ => Ok(Mode::EditingCategory { id, form }),
        }
    }

    fn handle_confirm_category_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmCategoryDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match delete_category(&self.conn, confirm.id) {
                    Ok(_) => {
                        self.refresh_category_screen()?;
                        self.set_status(format!("Deleted '{}'.", confirm.name), StatusKind::Info);
                        Ok(Mode::Normal)
                    }
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::ConfirmCategoryDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmCategoryDelete(confirm)),
        }
    }

    fn handle_add_user(&mut self, code: KeyCode, mut form: UserForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Add user cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Tab | KeyCode::BackTab => {
                form.toggle_field();
                Ok(Mode::AddingUser(form))
            }
            KeyCode::Backspace => {
                form.backspace();
                Ok(Mode::AddingUser(form))
            }
            KeyCode::Enter => match form.parse_inputs() {
                Ok((name, telephone, address)) => {
                    match create_user(&self.conn, &name, &telephone, &address) {
                        Ok(user) => {
                            self.refresh_user_screen()?;
                            self.set_status(format!("Added '{}'.", user.name), StatusKind::Info);
                            Ok(Mode::Normal)
                        }
                        Err(err) => {
                            let message = surface_error(&err);
                            form.error = Some(message.clone());
                            self.set_status(message, StatusKind::Error);
                            Ok(Mode::AddingUser(form))
                        }
                    }
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                    Ok(Mode::AddingUser(form))
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
                Ok(Mode::AddingUser(form))
            }
            _ => Ok(Mode::AddingUser(form)),
        }
    }

    fn handle_edit_user(&mut self, code: KeyCode, id: i64, mut form: UserForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Tab | KeyCode::BackTab => {
                form.toggle_field();
                Ok(Mode::EditingUser { id, form })
            }
            KeyCode::Backspace => {
                form.backspace();
                Ok(Mode::EditingUser { id, form })
            }
            KeyCode::Enter => match form.parse_inputs() {
                Ok((name, telephone, address)) => {
                    match update_user(&self.conn, id, &name, &telephone, &address) {
                        Ok(_) => {
                            self.refresh_user_screen()?;
                            let books = fetch_books(&self.conn)?;
                            if books.is_empty() {
                                self.set_status(
                                    format!("Updated '{name}'."),
                                    StatusKind::Info,
                                );
                                return Ok(Mode::Normal);
                            }
                            let state = BorrowPickState::load(&self.conn, id, name, books)?;
                            Ok(Mode::PickingBorrows(state))
                        }
                        Err(err) => {
                            let message = surface_error(&err);
                            form.error = Some(message.clone());
                            self.set_status(message, StatusKind::Error);
                            Ok(Mode::EditingUser { id, form })
                        }
                    }
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                    Ok(Mode::EditingUser { id, form })
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
                Ok(Mode::EditingUser { id, form })
            }
            _ => Ok(Mode::EditingUser { id, form }),
        }
    }

    fn handle_pick_borrows(&mut self, code: KeyCode, mut state: BorrowPickState) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Loan changes discarded.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Up => {
                state.move_selection(-1);
                Ok(Mode::PickingBorrows(state))
            }
            KeyCode::Down => {
                state.move_selection(1);
                Ok(Mode::PickingBorrows(state))
            }
            KeyCode::PageUp => {
                state.move_selection(-5);
                Ok(Mode::PickingBorrows(state))
            }
            KeyCode::PageDown => {
                state.move_selection(5);
                Ok(Mode::PickingBorrows(state))
            }
            KeyCode::Char(' ') => {
                state.toggle_current();
                Ok(Mode::PickingBorrows(state))
            }
            KeyCode::Enter => {
                let ids = state.checked_ids();
                match replace_user_borrows(&mut self.conn, state.user_id, &ids) {
                    Ok(_) => {
                        self.refresh_user_screen()?;
                        self.refresh_book_screen()?;
                        let message = if ids.is_empty() {
                            format!("'{}' has no books out.", state.user_name)
                        } else {
                            let plural = if ids.len() == 1 { "" } else { "s" };
                            format!(
                                "'{}' now has {} book{plural} out.",
                                state.user_name,
                                ids.len()
                            )
                        };
                        self.set_status(message, StatusKind::Info);
                        Ok(Mode::Normal)
                    }
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::PickingBorrows(state))
                    }
                }
            }
            _ => Ok(Mode::PickingBorrows(state)),
        }
    }

    fn handle_confirm_user_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmUserDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match delete_user(&self.conn, confirm.id) {
                    Ok(_) => {
                        self.refresh_user_screen()?;
                        self.set_status(format!("Deleted '{}'.", confirm.name), StatusKind::Info);
                        Ok(Mode::Normal)
                    }
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::ConfirmUserDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmUserDelete(confirm)),
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Books(books) => self.draw_book_list(frame, content_area, books),
            Screen::Categories(categories) => {
                self.draw_category_list(frame, content_area, categories)
            }
            Screen::Users(users) => self.draw_user_list(frame, content_area, users),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::AddingBook(form) => self.draw_book_form(frame, area, "Add Book", form),
            Mode::EditingBook { form, .. } => self.draw_book_form(frame, area, "Edit Book", form),
            Mode::PickingCategories(state) => self.draw_category_picker(frame, area, state),
            Mode::ConfirmBookDelete(confirm) => self.draw_confirm_book(frame, area, confirm),
            Mode::FilteringBooks(state) => self.draw_filter_palette(frame, area, state),
            Mode::AddingCategory(form) => {
                self.draw_category_form(frame, area, "Add Category", form)
            }
            Mode::EditingCategory { form, .. } => {
                self.draw_category_form(frame, area, "Edit Category", form)
            }
            Mode::ConfirmCategoryDelete(confirm) => {
                self.draw_confirm_category(frame, area, confirm)
            }
            Mode::AddingUser(form) => self.draw_user_form(frame, area, "Add User", form),
            Mode::EditingUser { form, .. } => self.draw_user_form(frame, area, "Edit User", form),
            Mode::PickingBorrows(state) => self.draw_borrow_picker(frame, area, state),
            Mode::ConfirmUserDelete(confirm) => self.draw_confirm_user(frame, area, confirm),
            Mode::Normal => {}
        }
    }

    fn draw_book_list(&self, frame: &mut Frame, area: Rect, books: &BookScreen) {
        let title = match books.filter_category_name() {
            Some(name) => format!("Books - {name}"),
            None => "Books".to_string(),
        };

        if books.books.is_empty() {
            let message = Paragraph::new("No books yet. Press '+' to add one.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(title));
            frame.render_widget(message, area);
            return;
        }

        if books.filtered_books.is_empty() {
            let message = Paragraph::new("No books in this category.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(title));
            frame.render_widget(message, area);
            return;
        }

        let card_height = BOOK_CARD_HEIGHT as usize;
        let capacity = ((area.height as usize) / card_height).max(1);
        let (start, end) = card_window(books.filtered_books.len(), books.selected, capacity);
        let visible_len = end - start;

        let constraints: Vec<Constraint> = (0..visible_len)
            .map(|_| Constraint::Length(BOOK_CARD_HEIGHT))
            .collect();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (idx, chunk) in rows.iter().enumerate() {
            if chunk.height == 0 {
                continue;
            }
            let book_index = start + idx;
            let book = &books.filtered_books[book_index];

            let mut block = Block::default().borders(Borders::ALL);
            if book_index == books.selected {
                block = block.style(Style::default().fg(Color::Yellow));
            }

            let title_text = if book_index == books.selected {
                format!("▶ {}", book.name)
            } else {
                book.name.clone()
            };

            let mut lines = vec![
                Line::from(Span::styled(
                    title_text,
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    book.author.clone(),
                    Style::default().fg(Color::Gray),
                )),
                Line::from(Span::raw(format!(
                    "Categories: {}",
                    comma_list(&books.category_names_for(book.id), "none")
                ))),
            ];

            match books.borrower_name_for(book.id) {
                Some(borrower) => lines.push(Line::from(Span::styled(
                    format!("On loan to {borrower}"),
                    Style::default().fg(Color::Red),
                ))),
                None => lines.push(Line::from(Span::styled(
                    "Available",
                    Style::default().fg(Color::DarkGray),
                ))),
            }

            let paragraph = Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: true })
                .alignment(Alignment::Left);
            frame.render_widget(paragraph, *chunk);
        }
    }

    fn draw_category_list(&self, frame: &mut Frame, area: Rect, categories: &CategoryScreen) {
        if categories.categories.is_empty() {
            let message = Paragraph::new("No categories yet. Press '+' to add one.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Categories"));
            frame.render_widget(message, area);
            return;
        }

        let items: Vec<ListItem> = categories
            .categories
            .iter()
            .map(|category| ListItem::new(category.name.clone()))
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Categories"))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(categories.selected));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn draw_user_list(&self, frame: &mut Frame, area: Rect, users: &UserScreen) {
        if users.users.is_empty() {
            let message = Paragraph::new("No users yet. Press '+' to add one.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Users"));
            frame.render_widget(message, area);
            return;
        }

        let card_height = USER_CARD_HEIGHT as usize;
        let capacity = ((area.height as usize) / card_height).max(1);
        let (start, end) = card_window(users.users.len(), users.selected, capacity);
        let visible_len = end - start;

        let constraints: Vec<Constraint> = (0..visible_len)
            .map(|_| Constraint::Length(USER_CARD_HEIGHT))
            .collect();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (idx, chunk) in rows.iter().enumerate() {
            if chunk.height == 0 {
                continue;
            }
            let user_index = start + idx;
            let user = &users.users[user_index];

            let mut block = Block::default().borders(Borders::ALL);
            if user_index == users.selected {
                block = block.style(Style::default().fg(Color::Yellow));
            }

            let name_text = if user_index == users.selected {
                format!("▶ {}", user.name)
            } else {
                user.name.clone()
            };

            let lines = vec![
                Line::from(Span::styled(
                    name_text,
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!("{}  -  {}", user.telephone, user.address),
                    Style::default().fg(Color::Gray),
                )),
                Line::from(Span::raw(format!(
                    "Borrowed: {}",
                    comma_list(&users.borrowed_titles_for(user.id), "nothing")
                ))),
            ];

            let paragraph = Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: true })
                .alignment(Alignment::Left);
            frame.render_widget(paragraph, *chunk);
        }
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        match (&self.screen, &self.mode) {
            (_, Mode::PickingCategories(_)) | (_, Mode::PickingBorrows(_)) => Line::from(vec![
                Span::styled("[↑↓]", key_style),
                Span::raw(" Navigate   "),
                Span::styled("[Space]", key_style),
                Span::raw(" Toggle   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Save   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
            (_, Mode::FilteringBooks(_)) => Line::from(vec![
                Span::styled("[↑↓]", key_style),
                Span::raw(" Navigate   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Apply Filter   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
            (Screen::Books(_), _) => Line::from(vec![
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select   "),
                Span::styled("[f]", key_style),
                Span::raw(" Filter   "),
                Span::styled("[+]", key_style),
                Span::raw(" Add   "),
                Span::styled("[-]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[e]", key_style),
                Span::raw(" Edit   "),
                Span::styled("[r]", key_style),
                Span::raw(" Return   "),
                Span::styled("[c]", key_style),
                Span::raw(" Categories   "),
                Span::styled("[u]", key_style),
                Span::raw(" Users   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
            (Screen::Categories(_), _) => Line::from(vec![
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select   "),
                Span::styled("[+]", key_style),
                Span::raw(" Add   "),
                Span::styled("[-]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[e]", key_style),
                Span::raw(" Edit   "),
                Span::styled("[u]", key_style),
                Span::raw(" Users   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Books   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
            (Screen::Users(_), _) => Line::from(vec![
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Loans   "),
                Span::styled("[+]", key_style),
                Span::raw(" Add   "),
                Span::styled("[-]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[e]", key_style),
                Span::raw(" Edit   "),
                Span::styled("[c]", key_style),
                Span::raw(" Categories   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Books   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
        }
    }

    fn draw_book_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &BookForm) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let name_line = form.build_line("Title", BookField::Name);
        let author_line = form.build_line("Author", BookField::Author);

        let mut lines = vec![name_line, author_line, Line::from("")];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to pick categories - Tab to switch - Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let (cursor_x, cursor_y) = match form.active {
            BookField::Name => {
                let prefix = "Title: ".len() as u16;
                (
                    inner.x + prefix + form.value_len(BookField::Name) as u16,
                    inner.y,
                )
            }
            BookField::Author => {
                let prefix = "Author: ".len() as u16;
                (
                    inner.x + prefix + form.value_len(BookField::Author) as u16,
                    inner.y + 1,
                )
            }
        };
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn draw_category_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &CategoryForm) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![form.build_line(), Line::from("")];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save - Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let cursor_x = inner.x + "Name: ".len() as u16 + form.value_len() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_user_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &UserForm) {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let name_line = form.build_line("Name", UserField::Name);
        let telephone_line = form.build_line("Telephone", UserField::Telephone);
        let address_line = form.build_line("Address", UserField::Address);

        let mut lines = vec![name_line, telephone_line, address_line, Line::from("")];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save - Tab to switch - Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let (cursor_x, cursor_y) = match form.active {
            UserField::Name => {
                let prefix = "Name: ".len() as u16;
                (
                    inner.x + prefix + form.value_len(UserField::Name) as u16,
                    inner.y,
                )
            }
            UserField::Telephone => {
                let prefix = "Telephone: ".len() as u16;
                (
                    inner.x + prefix + form.value_len(UserField::Telephone) as u16,
                    inner.y + 1,
                )
            }
            UserField::Address => {
                let prefix = "Address: ".len() as u16;
                (
                    inner.x + prefix + form.value_len(UserField::Address) as u16,
                    inner.y + 2,
                )
            }
        };
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn draw_category_picker(&self, frame: &mut Frame, area: Rect, state: &CategoryPickState) {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let title = match &state.pending {
            PendingBook::Create { name, .. } => format!("Categories for '{name}'"),
            PendingBook::Edit { name, .. } => format!("Categories for '{name}'"),
        };
        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let items: Vec<ListItem> = state
            .categories
            .iter()
            .enumerate()
            .map(|(index, category)| {
                let checkbox = if state.is_checked(index) { "[x]" } else { "[ ]" };
                ListItem::new(format!("{checkbox} {}", category.name))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::NONE))
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(state.selected));
        frame.render_stateful_widget(list, inner, &mut list_state);
    }

    fn draw_borrow_picker(&self, frame: &mut Frame, area: Rect, state: &BorrowPickState) {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(format!("Books out with '{}'", state.user_name))
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let items: Vec<ListItem> = state
            .books
            .iter()
            .enumerate()
            .map(|(index, book)| {
                let checkbox = if state.is_checked(index) { "[x]" } else { "[ ]" };
                ListItem::new(format!("{checkbox} {}", book.display_title()))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::NONE))
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(state.selected));
        frame.render_stateful_widget(list, inner, &mut list_state);
    }

    fn draw_filter_palette(&self, frame: &mut Frame, area: Rect, state: &CategoryFilterState) {
        let popup_area = centered_rect(50, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Filter by Category")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut items = vec![ListItem::new("All")];
        items.extend(
            state
                .categories
                .iter()
                .map(|category| ListItem::new(category.name.clone())),
        );

        let list = List::new(items)
            .block(Block::default().borders(Borders::NONE))
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(state.selected));
        frame.render_stateful_widget(list, inner, &mut list_state);
    }

    fn draw_confirm_book(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmBookDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Delete Book").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Delete '{}' permanently?", confirm.name)),
            Line::from("Category links and borrow records go with it."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_confirm_category(
        &self,
        frame: &mut Frame,
        area: Rect,
        confirm: &ConfirmCategoryDelete,
    ) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Delete Category")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Delete '{}' permanently?", confirm.name)),
            Line::from("Books stay; their links to this category are removed."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_confirm_user(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmUserDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Delete User").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Delete '{}' permanently?", confirm.name)),
            Line::from("Their borrow records are removed as well."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn save_new_book(&mut self, name: &str, author: &str, category_ids: &[i64]) -> Result<String> {
        let book = create_book(&self.conn, name, author)?;
        replace_book_categories(&mut self.conn, book.id, category_ids)?;
        Ok(format!("Added '{}'.", book.name))
    }

    fn save_existing_book(
        &mut self,
        id: i64,
        name: &str,
        author: &str,
        category_ids: &[i64],
    ) -> Result<String> {
        update_book(&self.conn, id, name, author)?;
        replace_book_categories(&mut self.conn, id, category_ids)?;
        Ok(format!("Updated '{name}'."))
    }

    fn open_books(&mut self) -> Result<()> {
        self.screen = Screen::Books(load_book_screen(&self.conn)?);
        Ok(())
    }

    fn open_categories(&mut self) -> Result<()> {
        let categories = fetch_categories(&self.conn)?;
        self.screen = Screen::Categories(CategoryScreen::new(categories));
        Ok(())
    }

    fn open_users(&mut self) -> Result<()> {
        let users = fetch_users(&self.conn)?;
        let books = fetch_books(&self.conn)?;
        let borrows = fetch_borrowed_books(&self.conn)?;
        self.screen = Screen::Users(UserScreen::new(users, books, borrows));
        Ok(())
    }

    /// Re-read every table backing the book list after a mutation. The
    /// full-table refresh keeps screen state trivially consistent with the
    /// database at the cost of a few extra reads.
    fn refresh_book_screen(&mut self) -> Result<()> {
        if let Screen::Books(ref mut books) = self.screen {
            let fresh_books = fetch_books(&self.conn)?;
            let categories = fetch_categories(&self.conn)?;
            let links = fetch_book_categories(&self.conn)?;
            let borrows = fetch_borrowed_books(&self.conn)?;
            let users = fetch_users(&self.conn)?;
            books.set_data(fresh_books, categories, links, borrows, users);
        }
        Ok(())
    }

    fn refresh_category_screen(&mut self) -> Result<()> {
        if let Screen::Categories(ref mut categories) = self.screen {
            categories.set_categories(fetch_categories(&self.conn)?);
        }
        Ok(())
    }

    fn refresh_user_screen(&mut self) -> Result<()> {
        if let Screen::Users(ref mut users) = self.screen {
            let fresh_users = fetch_users(&self.conn)?;
            let books = fetch_books(&self.conn)?;
            let borrows = fetch_borrowed_books(&self.conn)?;
            users.set_data(fresh_users, books, borrows);
        }
        Ok(())
    }
}

/// Fetch everything the book list needs in one go.
fn load_book_screen(conn: &Connection) -> Result<BookScreen> {
    let books = fetch_books(conn)?;
    let categories = fetch_categories(conn)?;
    let links = fetch_book_categories(conn)?;
    let borrows = fetch_borrowed_books(conn)?;
    let users = fetch_users(conn)?;
    Ok(BookScreen::new(books, categories, links, borrows, users))
}

/// Window of list indices to render so the selection stays visible.
fn card_window(len: usize, selected: usize, capacity: usize) -> (usize, usize) {
    let mut start = if selected >= capacity {
        selected + 1 - capacity
    } else {
        0
    };
    if start + capacity > len {
        start = len.saturating_sub(capacity);
    }
    let end = min(start + capacity, len);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::card_window;

    #[test]
    fn card_window_tracks_the_selection() {
        assert_eq!(card_window(10, 0, 3), (0, 3));
        assert_eq!(card_window(10, 5, 3), (3, 6));
        assert_eq!(card_window(10, 9, 3), (7, 10));
        assert_eq!(card_window(2, 1, 3), (0, 2));
    }
}
