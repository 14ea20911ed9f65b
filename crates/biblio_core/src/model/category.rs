//! Category domain model.
//!
//! # Responsibility
//! - Define the Category record and its write-side draft.
//! - Validate name/description constraints before persistence.
//!
//! # Invariants
//! - `name` is required and at most 100 characters.
//! - `description` is at most 500 characters when present.
//! - Categories with ids 1-5 are seeded at first initialization.

use crate::model::book::Book;
use crate::model::validation::{normalize_optional, trim_in_place, ValidationErrors};
use serde::{Deserialize, Serialize};

/// Storage-assigned category identifier.
pub type CategoryId = i64;

pub const CATEGORY_NAME_MAX_CHARS: usize = 100;
pub const CATEGORY_DESCRIPTION_MAX_CHARS: usize = 500;

/// Number of categories present right after the first migration.
pub const SEEDED_CATEGORY_COUNT: usize = 5;

/// Persisted category record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
}

/// Caller-supplied fields for creating or editing a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    pub description: Option<String>,
}

impl CategoryDraft {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
        }
    }

    /// Trims text fields and treats a blank description as absent.
    pub fn normalize(&mut self) {
        trim_in_place(&mut self.name);
        normalize_optional(&mut self.description);
    }

    /// Checks field constraints, collecting every violation.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", &self.name, CATEGORY_NAME_MAX_CHARS);
        errors.optional_text(
            "description",
            self.description.as_deref(),
            CATEGORY_DESCRIPTION_MAX_CHARS,
        );
        errors.into_result()
    }
}

/// Category with its referencing books attached, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryWithBooks {
    pub category: Category,
    pub books: Vec<Book>,
}

#[cfg(test)]
mod tests {
    use super::{CategoryDraft, CATEGORY_DESCRIPTION_MAX_CHARS};
    use crate::model::validation::FieldErrorKind;

    #[test]
    fn blank_name_is_required() {
        let errors = CategoryDraft::new("  ", None).validate().unwrap_err();
        assert!(errors.has_field("name"));
        assert_eq!(errors.errors()[0].kind, FieldErrorKind::Required);
    }

    #[test]
    fn overlong_fields_are_all_reported() {
        let draft = CategoryDraft::new(
            "n".repeat(101),
            Some("d".repeat(CATEGORY_DESCRIPTION_MAX_CHARS + 1)),
        );
        let errors = draft.validate().unwrap_err();
        assert_eq!(errors.errors().len(), 2);
        assert!(errors.has_field("name"));
        assert!(errors.has_field("description"));
    }

    #[test]
    fn normalize_trims_and_drops_blank_description() {
        let mut draft = CategoryDraft::new("  Sci-Fi ", Some(" ".to_string()));
        draft.normalize();
        assert_eq!(draft.name, "Sci-Fi");
        assert_eq!(draft.description, None);
        assert!(draft.validate().is_ok());
    }
}
