//! Naming strategies mapping logical entity/property names to SQL names.

use heck::{ToSnakeCase, ToShoutySnakeCase};

/// Strategy for deriving table and column names from entity and property names.
///
/// The default maps `BookAuthor` / `authorName` to `book_author` / `author_name`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamingStrategy {
    /// `BookAuthor` -> `book_author`
    #[default]
    UnderscoreSeparatedLowerCase,
    /// `BookAuthor` -> `BOOK_AUTHOR`
    UnderscoreSeparatedUpperCase,
    /// `BookAuthor` -> `bookauthor`
    LowerCase,
    /// `BookAuthor` -> `BOOKAUTHOR`
    UpperCase,
    /// Names are used exactly as declared
    Raw,
}

impl NamingStrategy {
    /// Map a logical name to its SQL form.
    pub fn mapped_name(&self, name: &str) -> String {
        match self {
            Self::UnderscoreSeparatedLowerCase => name.to_snake_case(),
            Self::UnderscoreSeparatedUpperCase => name.to_shouty_snake_case(),
            Self::LowerCase => name.to_lowercase().replace('_', ""),
            Self::UpperCase => name.to_uppercase().replace('_', ""),
            Self::Raw => name.to_string(),
        }
    }
}
