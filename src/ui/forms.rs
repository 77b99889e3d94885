use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{Book, Category, User};

/// Internal representation of the "book" form fields.
#[derive(Default, Clone)]
pub(crate) struct BookForm {
    pub(crate) name: String,
    pub(crate) author: String,
    pub(crate) active: BookField,
    pub(crate) error: Option<String>,
}

/// Fields available within the book form.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum BookField {
    #[default]
    Name,
    Author,
}

impl BookForm {
    /// Populate the form from an existing book when editing.
    pub(crate) fn from_book(book: &Book) -> Self {
        Self {
            name: book.name.clone(),
            author: book.author.clone(),
            active: BookField::Name,
            error: None,
        }
    }

    /// Swap focus between the title and author fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            BookField::Name => BookField::Author,
            BookField::Author => BookField::Name,
        };
    }

    /// Append a character to the active field, rejecting control characters.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            BookField::Name => self.name.push(ch),
            BookField::Author => self.author.push(ch),
        }
        true
    }

    /// Remove the last character from the active field.
    pub(crate) fn backspace(&mut self) {
        match self.active {
            BookField::Name => {
                self.name.pop();
            }
            BookField::Author => {
                self.author.pop();
            }
        }
    }

    /// Validate the inputs and return typed values ready for persistence.
    pub(crate) fn parse_inputs(&self) -> Result<(String, String)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Book title is required."));
        }
        let author = self.author.trim();
        if author.is_empty() {
            return Err(anyhow!("Book author is required."));
        }
        Ok((name.to_string(), author.to_string()))
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(&self, field_name: &str, field: BookField) -> Line<'static> {
        let (value, is_active) = match field {
            BookField::Name => (&self.name, self.active == BookField::Name),
            BookField::Author => (&self.author, self.active == BookField::Author),
        };
        styled_form_line(field_name, value, is_active, "<required>")
    }

    /// Return the character count for the requested field.
    pub(crate) fn value_len(&self, field: BookField) -> usize {
        match field {
            BookField::Name => self.name.chars().count(),
            BookField::Author => self.author.chars().count(),
        }
    }
}

/// Single-field form used for both category creation and renaming.
#[derive(Default, Clone)]
pub(crate) struct CategoryForm {
    pub(crate) name: String,
    pub(crate) error: Option<String>,
}

impl CategoryForm {
    pub(crate) fn from_category(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            error: None,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.name.push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.name.pop();
    }

    pub(crate) fn parse_inputs(&self) -> Result<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Category name is required."));
        }
        Ok(name.to_string())
    }

    pub(crate) fn build_line(&self) -> Line<'static> {
        styled_form_line("Name", &self.name, true, "<required>")
    }

    pub(crate) fn value_len(&self) -> usize {
        self.name.chars().count()
    }
}

/// Form state for user creation/editing.
#[derive(Default, Clone)]
pub(crate) struct UserForm {
    pub(crate) name: String,
    pub(crate) telephone: String,
    pub(crate) address: String,
    pub(crate) active: UserField,
    pub(crate) error: Option<String>,
}

/// Enumerates the fields within the user form to drive focus management.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum UserField {
    #[default]
    Name,
    Telephone,
    Address,
}

impl UserForm {
    /// Populate the form from an existing user when entering edit mode.
    pub(crate) fn from_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            telephone: user.telephone.clone(),
            address: user.address.clone(),
            active: UserField::Name,
            error: None,
        }
    }

    /// Cycle focus across the three user fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            UserField::Name => UserField::Telephone,
            UserField::Telephone => UserField::Address,
            UserField::Address => UserField::Name,
        };
    }

    /// Insert a character into the active field. The telephone field only
    /// accepts digits and common phone punctuation.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            UserField::Name => self.name.push(ch),
            UserField::Telephone => {
                if ch.is_ascii_digit() || matches!(ch, '+' | '-' | ' ' | '(' | ')') {
                    self.telephone.push(ch);
                } else {
                    return false;
                }
            }
            UserField::Address => self.address.push(ch),
        }
        true
    }

    /// Remove a character from the active field.
    pub(crate) fn backspace(&mut self) {
        match self.active {
            UserField::Name => {
                self.name.pop();
            }
            UserField::Telephone => {
                self.telephone.pop();
            }
            UserField::Address => {
                self.address.pop();
            }
        }
    }

    /// Validate and normalize form inputs before they are written to the
    /// database. All three fields are required.
    pub(crate) fn parse_inputs(&self) -> Result<(String, String, String)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("User name is required."));
        }
        let telephone = self.telephone.trim();
        if telephone.is_empty() {
            return Err(anyhow!("Telephone is required."));
        }
        let address = self.address.trim();
        if address.is_empty() {
            return Err(anyhow!("Address is required."));
        }
        Ok((
            name.to_string(),
            telephone.to_string(),
            address.to_string(),
        ))
    }

    /// Render a styled line for the modal form.
    pub(crate) fn build_line(&self, field_name: &str, field: UserField) -> Line<'static> {
        let (value, is_active) = match field {
            UserField::Name => (&self.name, self.active == UserField::Name),
            UserField::Telephone => (&self.telephone, self.active == UserField::Telephone),
            UserField::Address => (&self.address, self.active == UserField::Address),
        };
        styled_form_line(field_name, value, is_active, "<required>")
    }

    /// Character length of the requested field.
    pub(crate) fn value_len(&self, field: UserField) -> usize {
        match field {
            UserField::Name => self.name.chars().count(),
            UserField::Telephone => self.telephone.chars().count(),
            UserField::Address => self.address.chars().count(),
        }
    }
}

/// Shared rendering for a labelled form field with focus highlighting.
fn styled_form_line(
    field_name: &str,
    value: &str,
    is_active: bool,
    placeholder: &str,
) -> Line<'static> {
    let display = if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    };

    let style = if is_active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(format!("{field_name}: ")),
        Span::styled(display, style),
    ])
}

/// State for confirming permanent book deletion.
#[derive(Clone)]
pub(crate) struct ConfirmBookDelete {
    pub(crate) id: i64,
    pub(crate) name: String,
}

impl ConfirmBookDelete {
    pub(crate) fn from(book: Book) -> Self {
        Self {
            id: book.id,
            name: book.name,
        }
    }
}

/// State for confirming category deletion.
#[derive(Clone)]
pub(crate) struct ConfirmCategoryDelete {
    pub(crate) id: i64,
    pub(crate) name: String,
}

impl ConfirmCategoryDelete {
    pub(crate) fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

/// State for confirming user deletion.
#[derive(Clone)]
pub(crate) struct ConfirmUserDelete {
    pub(crate) id: i64,
    pub(crate) name: String,
}

impl ConfirmUserDelete {
    pub(crate) fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_form_requires_both_fields() {
        let mut form = BookForm::default();
        assert!(form.parse_inputs().is_err());
        form.name = "Dune".to_string();
        assert!(form.parse_inputs().is_err());
        form.author = " Frank Herbert ".to_string();
        let (name, author) = form.parse_inputs().unwrap();
        assert_eq!(name, "Dune");
        assert_eq!(author, "Frank Herbert");
    }

    #[test]
    fn telephone_field_rejects_letters() {
        let mut form = UserForm::default();
        form.active = UserField::Telephone;
        assert!(form.push_char('5'));
        assert!(form.push_char('-'));
        assert!(!form.push_char('x'));
        assert_eq!(form.telephone, "5-");
    }

    #[test]
    fn user_form_requires_all_fields() {
        let mut form = UserForm::default();
        form.name = "Ada".to_string();
        form.telephone = "555".to_string();
        assert!(form.parse_inputs().is_err());
        form.address = "12 Crescent Rd".to_string();
        assert!(form.parse_inputs().is_ok());
    }

    #[test]
    fn category_form_trims_whitespace() {
        let mut form = CategoryForm::default();
        form.name = "  History  ".to_string();
        assert_eq!(form.parse_inputs().unwrap(), "History");
    }
}
