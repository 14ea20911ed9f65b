//! Store-level error taxonomy.

use crate::db::DbError;
use crate::model::book::BookId;
use crate::model::category::CategoryId;
use crate::model::validation::ValidationErrors;
use crate::model::EpochMillis;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Record kind named by `NotFound` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Category,
    Book,
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Category => f.write_str("category"),
            Self::Book => f.write_str("book"),
        }
    }
}

/// Repository error for catalog persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// One or more field constraints failed; nothing was written.
    Validation(ValidationErrors),
    /// Target id does not exist (never existed or already deleted).
    NotFound { entity: Entity, id: i64 },
    /// Category delete blocked by referencing books.
    ReferentialConflict {
        category_id: CategoryId,
        book_count: u64,
    },
    /// Book changed since the caller read it.
    ConcurrencyConflict {
        book_id: BookId,
        expected: Option<EpochMillis>,
        actual: Option<EpochMillis>,
    },
    Db(DbError),
    /// Persisted row cannot be decoded into a valid record.
    InvalidData(String),
}

impl RepoError {
    pub(crate) fn category_not_found(id: CategoryId) -> Self {
        Self::NotFound {
            entity: Entity::Category,
            id,
        }
    }

    pub(crate) fn book_not_found(id: BookId) -> Self {
        Self::NotFound {
            entity: Entity::Book,
            id,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::ReferentialConflict {
                category_id,
                book_count,
            } => write!(
                f,
                "category {category_id} is referenced by {book_count} book(s)"
            ),
            Self::ConcurrencyConflict {
                book_id,
                expected,
                actual,
            } => write!(
                f,
                "book {book_id} was modified concurrently (expected revision {expected:?}, found {actual:?})"
            ),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted catalog data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::ReferentialConflict { .. } => None,
            Self::ConcurrencyConflict { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationErrors> for RepoError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Returns whether `err` is SQLite rejecting a write on a foreign key.
pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}
