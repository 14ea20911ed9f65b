//! Book domain model.
//!
//! # Responsibility
//! - Define the Book record, its reading status and its write-side draft.
//! - Validate text/range constraints before persistence.
//!
//! # Invariants
//! - `registered_at` is set once by storage and never changes.
//! - `updated_at` is `None` until the first successful edit.
//! - `status` transitions are unrestricted.
//! - Category existence is checked by the store, not here.

use crate::model::category::{Category, CategoryId};
use crate::model::validation::{
    normalize_optional, trim_in_place, FieldErrorKind, ValidationErrors,
};
use crate::model::EpochMillis;
use serde::{Deserialize, Serialize};

/// Storage-assigned book identifier.
pub type BookId = i64;

pub const BOOK_TITLE_MAX_CHARS: usize = 200;
pub const BOOK_AUTHOR_MAX_CHARS: usize = 150;
pub const ISBN_MIN_CHARS: usize = 10;
pub const ISBN_MAX_CHARS: usize = 13;
pub const YEAR_MIN: i32 = 1000;
pub const YEAR_MAX: i32 = 9999;

/// Reading progress for one book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadingStatus {
    #[default]
    WantToRead,
    Reading,
    Read,
}

impl ReadingStatus {
    pub const ALL: [ReadingStatus; 3] = [Self::WantToRead, Self::Reading, Self::Read];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WantToRead => "WantToRead",
            Self::Reading => "Reading",
            Self::Read => "Read",
        }
    }

    /// Parses a status name, accepting `WantToRead` or `want_to_read` spellings.
    pub fn parse(value: &str) -> Option<Self> {
        let folded: String = value
            .trim()
            .chars()
            .filter(|ch| *ch != '_' && *ch != '-' && !ch.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "wanttoread" => Some(Self::WantToRead),
            "reading" => Some(Self::Reading),
            "read" => Some(Self::Read),
            _ => None,
        }
    }

    pub(crate) fn to_db(self) -> i64 {
        match self {
            Self::WantToRead => 0,
            Self::Reading => 1,
            Self::Read => 2,
        }
    }

    pub(crate) fn from_db(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::WantToRead),
            1 => Some(Self::Reading),
            2 => Some(Self::Read),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub year: Option<i32>,
    pub status: ReadingStatus,
    pub category_id: CategoryId,
    pub registered_at: EpochMillis,
    pub updated_at: Option<EpochMillis>,
}

impl Book {
    /// Trims text fields and treats a blank ISBN as absent.
    pub fn normalize(&mut self) {
        trim_in_place(&mut self.title);
        trim_in_place(&mut self.author);
        normalize_optional(&mut self.isbn);
    }

    /// Checks the editable fields, collecting every violation.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validate_book_fields(&self.title, &self.author, self.isbn.as_deref(), self.year)
    }

    /// Latest edit time, falling back to registration time.
    pub fn last_modified(&self) -> EpochMillis {
        self.updated_at.unwrap_or(self.registered_at)
    }
}

/// Caller-supplied fields for creating a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub status: ReadingStatus,
    pub category_id: CategoryId,
}

impl BookDraft {
    /// Creates a draft with no ISBN/year and status `WantToRead`.
    pub fn new(title: impl Into<String>, author: impl Into<String>, category_id: CategoryId) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            isbn: None,
            year: None,
            status: ReadingStatus::default(),
            category_id,
        }
    }

    pub fn normalize(&mut self) {
        trim_in_place(&mut self.title);
        trim_in_place(&mut self.author);
        normalize_optional(&mut self.isbn);
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validate_book_fields(&self.title, &self.author, self.isbn.as_deref(), self.year)
    }
}

/// Book with its category attached, as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookWithCategory {
    pub book: Book,
    pub category: Category,
}

fn validate_book_fields(
    title: &str,
    author: &str,
    isbn: Option<&str>,
    year: Option<i32>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require_text("title", title, BOOK_TITLE_MAX_CHARS);
    errors.require_text("author", author, BOOK_AUTHOR_MAX_CHARS);

    if let Some(isbn) = isbn {
        let len = isbn.chars().count();
        if !(ISBN_MIN_CHARS..=ISBN_MAX_CHARS).contains(&len) {
            errors.push(
                "isbn",
                FieldErrorKind::LengthOutOfRange {
                    min: ISBN_MIN_CHARS,
                    max: ISBN_MAX_CHARS,
                },
            );
        }
    }

    if let Some(year) = year {
        if !(YEAR_MIN..=YEAR_MAX).contains(&year) {
            errors.push(
                "year",
                FieldErrorKind::OutOfRange {
                    min: i64::from(YEAR_MIN),
                    max: i64::from(YEAR_MAX),
                },
            );
        }
    }

    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::{BookDraft, ReadingStatus};
    use crate::model::validation::FieldErrorKind;

    #[test]
    fn new_draft_defaults_to_want_to_read() {
        let draft = BookDraft::new("Dune", "Herbert", 6);
        assert_eq!(draft.status, ReadingStatus::WantToRead);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn isbn_and_year_bounds_are_inclusive() {
        let mut draft = BookDraft::new("Dune", "Herbert", 1);
        draft.isbn = Some("0441172717".to_string());
        draft.year = Some(1000);
        assert!(draft.validate().is_ok());

        draft.isbn = Some("9780441172719".to_string());
        draft.year = Some(9999);
        assert!(draft.validate().is_ok());

        draft.isbn = Some("123456789".to_string());
        draft.year = Some(999);
        let errors = draft.validate().unwrap_err();
        assert!(errors.has_field("isbn"));
        assert!(errors.has_field("year"));
    }

    #[test]
    fn missing_title_and_author_are_both_reported() {
        let errors = BookDraft::new("", " ", 1).validate().unwrap_err();
        let fields: Vec<_> = errors.errors().iter().map(|error| error.field).collect();
        assert_eq!(fields, vec!["title", "author"]);
        assert!(errors
            .errors()
            .iter()
            .all(|error| error.kind == FieldErrorKind::Required));
    }

    #[test]
    fn blank_isbn_is_dropped_by_normalize() {
        let mut draft = BookDraft::new(" Dune ", "Herbert", 1);
        draft.isbn = Some("   ".to_string());
        draft.normalize();
        assert_eq!(draft.title, "Dune");
        assert_eq!(draft.isbn, None);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn status_codec_and_parse() {
        for status in ReadingStatus::ALL {
            assert_eq!(ReadingStatus::from_db(status.to_db()), Some(status));
            assert_eq!(ReadingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ReadingStatus::from_db(7), None);
        assert_eq!(
            ReadingStatus::parse("want_to_read"),
            Some(ReadingStatus::WantToRead)
        );
        assert_eq!(ReadingStatus::parse("finished"), None);
    }

    #[test]
    fn status_serializes_by_variant_name() {
        let json = serde_json::to_string(&ReadingStatus::Reading).unwrap();
        assert_eq!(json, "\"Reading\"");
    }
}
