//! Catalog use-case service.
//!
//! # Responsibility
//! - Normalize and validate caller input before it reaches the store.
//! - Compose book listing filters from optional shell parameters.
//! - Map store errors into the caller-facing `CatalogError` taxonomy.
//!
//! # Invariants
//! - A category is deleted only when no book references it.
//! - Book edits never change `registered_at` and always refresh `updated_at`.
//! - Deleting a missing book succeeds; deleting a missing category does not.

use crate::model::book::{Book, BookDraft, BookId, BookWithCategory, ReadingStatus};
use crate::model::category::{Category, CategoryDraft, CategoryId, CategoryWithBooks};
use crate::model::validation::ValidationErrors;
use crate::model::EpochMillis;
use crate::repo::book_repo::{
    BookFilter, BookRepository, CatalogSummary, ConcurrencyMode, SqliteBookRepository, TextMatch,
};
use crate::repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
use crate::repo::error::{Entity, RepoError};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for catalog use-cases.
#[derive(Debug)]
pub enum CatalogError {
    /// Input failed field constraints or referenced a missing category.
    Validation(ValidationErrors),
    /// Target record does not exist.
    NotFound { entity: Entity, id: i64 },
    /// Category still referenced by `book_count` books.
    ReferentialConflict {
        category_id: CategoryId,
        book_count: u64,
    },
    /// Book changed between the caller's read and this write.
    ConcurrencyConflict {
        book_id: BookId,
        expected: Option<EpochMillis>,
        actual: Option<EpochMillis>,
    },
    /// Unrecoverable storage fault.
    Storage(RepoError),
}

impl CatalogError {
    /// Returns `true` for typed outcomes of normal operation, `false` for
    /// storage faults the shell must treat as fatal for this request.
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::ReferentialConflict {
                category_id,
                book_count,
            } => write!(
                f,
                "category {category_id} cannot be deleted: {book_count} book(s) reference it"
            ),
            Self::ConcurrencyConflict { book_id, .. } => {
                write!(f, "book {book_id} was changed by another writer")
            }
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for CatalogError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for CatalogError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(errors) => Self::Validation(errors),
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::ReferentialConflict {
                category_id,
                book_count,
            } => Self::ReferentialConflict {
                category_id,
                book_count,
            },
            RepoError::ConcurrencyConflict {
                book_id,
                expected,
                actual,
            } => Self::ConcurrencyConflict {
                book_id,
                expected,
                actual,
            },
            other => {
                error!(
                    "event=catalog_storage module=service status=error error={}",
                    other
                );
                Self::Storage(other)
            }
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Optional shell parameters for book listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    /// Free text matched against title or author; blank means no filter.
    pub term: Option<String>,
    pub category_id: Option<CategoryId>,
    pub status: Option<ReadingStatus>,
}

/// Catalog service facade over category and book repositories.
pub struct CatalogService<C: CategoryRepository, B: BookRepository> {
    categories: C,
    books: B,
    text_match: TextMatch,
}

/// Service wired to SQLite repositories sharing one connection.
pub type SqliteCatalogService<'conn> =
    CatalogService<SqliteCategoryRepository<'conn>, SqliteBookRepository<'conn>>;

impl<'conn> SqliteCatalogService<'conn> {
    /// Builds a service over a migrated connection.
    pub fn from_connection(conn: &'conn Connection) -> Self {
        CatalogService::new(
            SqliteCategoryRepository::new(conn),
            SqliteBookRepository::new(conn),
        )
    }
}

impl<C: CategoryRepository, B: BookRepository> CatalogService<C, B> {
    pub fn new(categories: C, books: B) -> Self {
        Self {
            categories,
            books,
            text_match: TextMatch::default(),
        }
    }

    /// Sets case handling for the free-text book filter.
    pub fn with_text_match(mut self, text_match: TextMatch) -> Self {
        self.text_match = text_match;
        self
    }

    pub fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        Ok(self.categories.list_categories()?)
    }

    pub fn list_categories_with_books(&self) -> CatalogResult<Vec<CategoryWithBooks>> {
        Ok(self.categories.list_categories_with_books()?)
    }

    pub fn get_category(&self, id: CategoryId) -> CatalogResult<Category> {
        self.categories
            .get_category(id)?
            .ok_or(CatalogError::NotFound {
                entity: Entity::Category,
                id,
            })
    }

    /// Books referencing one category, newest registration first.
    pub fn category_books(&self, id: CategoryId) -> CatalogResult<Vec<Book>> {
        self.get_category(id)?;
        Ok(self.categories.books_in_category(id)?)
    }

    pub fn create_category(&self, mut draft: CategoryDraft) -> CatalogResult<Category> {
        draft.normalize();
        draft.validate()?;

        let category = self.categories.add_category(&draft)?;
        info!(
            "event=category_create module=service status=ok category_id={}",
            category.id
        );
        Ok(category)
    }

    /// Overwrites name/description. A category removed since the caller read
    /// it yields `NotFound`.
    pub fn edit_category(&self, id: CategoryId, mut draft: CategoryDraft) -> CatalogResult<Category> {
        draft.normalize();
        draft.validate()?;

        match self.categories.update_category(id, &draft) {
            Ok(category) => {
                info!(
                    "event=category_update module=service status=ok category_id={}",
                    id
                );
                Ok(category)
            }
            Err(err) => {
                log_write_failure("category_update", id, &err);
                Err(err.into())
            }
        }
    }

    /// Deletes a category that no book references.
    ///
    /// # Errors
    /// - `NotFound` when the category is absent.
    /// - `ReferentialConflict` carrying the blocking book count.
    pub fn delete_category(&self, id: CategoryId) -> CatalogResult<()> {
        self.get_category(id)?;

        let book_count = self.categories.count_books_in_category(id)?;
        if book_count > 0 {
            warn!(
                "event=category_delete module=service status=conflict category_id={} book_count={}",
                id, book_count
            );
            return Err(CatalogError::ReferentialConflict {
                category_id: id,
                book_count,
            });
        }

        match self.categories.delete_category(id) {
            Ok(()) => {
                info!(
                    "event=category_delete module=service status=ok category_id={}",
                    id
                );
                Ok(())
            }
            Err(err) => {
                log_write_failure("category_delete", id, &err);
                Err(err.into())
            }
        }
    }

    /// Lists books matching every supplied filter, newest registration first.
    pub fn list_books(&self, query: &BookQuery) -> CatalogResult<Vec<BookWithCategory>> {
        let filter = BookFilter {
            term: query
                .term
                .as_deref()
                .map(str::trim)
                .filter(|term| !term.is_empty())
                .map(str::to_string),
            category_id: query.category_id,
            status: query.status,
            text_match: self.text_match,
            limit: None,
        };
        debug!(
            "event=book_list module=service has_term={} category_id={:?} status={:?}",
            filter.term.is_some(),
            filter.category_id,
            filter.status
        );
        Ok(self.books.list_books(&filter)?)
    }

    pub fn get_book(&self, id: BookId) -> CatalogResult<Book> {
        self.books.get_book(id)?.ok_or(CatalogError::NotFound {
            entity: Entity::Book,
            id,
        })
    }

    /// One book with its category attached.
    pub fn book_details(&self, id: BookId) -> CatalogResult<BookWithCategory> {
        self.books
            .get_book_with_category(id)?
            .ok_or(CatalogError::NotFound {
                entity: Entity::Book,
                id,
            })
    }

    pub fn create_book(&self, mut draft: BookDraft) -> CatalogResult<Book> {
        draft.normalize();
        draft.validate()?;

        let book = self.books.add_book(&draft)?;
        info!(
            "event=book_create module=service status=ok book_id={} category_id={}",
            book.id, book.category_id
        );
        Ok(book)
    }

    /// Saves an edited book.
    ///
    /// `registered_at` on `book` is ignored; the stored value is kept. With
    /// `ConcurrencyMode::Optimistic`, `book.updated_at` must still match the
    /// stored revision.
    pub fn edit_book(&self, mut book: Book, mode: ConcurrencyMode) -> CatalogResult<Book> {
        book.normalize();
        book.validate()?;

        match self.books.update_book(&book, mode) {
            Ok(updated) => {
                info!(
                    "event=book_update module=service status=ok book_id={}",
                    updated.id
                );
                Ok(updated)
            }
            Err(err) => {
                log_write_failure("book_update", book.id, &err);
                Err(err.into())
            }
        }
    }

    /// Changes only the reading status.
    pub fn set_book_status(&self, id: BookId, status: ReadingStatus) -> CatalogResult<Book> {
        match self.books.update_book_status(id, status) {
            Ok(updated) => {
                info!(
                    "event=book_status module=service status=ok book_id={} reading_status={}",
                    id, status
                );
                Ok(updated)
            }
            Err(err) => {
                log_write_failure("book_status", id, &err);
                Err(err.into())
            }
        }
    }

    /// Deletes a book; an already-absent id is a successful no-op.
    pub fn delete_book(&self, id: BookId) -> CatalogResult<()> {
        match self.books.delete_book(id) {
            Ok(()) => {
                info!("event=book_delete module=service status=ok book_id={}", id);
                Ok(())
            }
            Err(RepoError::NotFound { .. }) => {
                debug!(
                    "event=book_delete module=service status=noop book_id={}",
                    id
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Dashboard counters and the five most recently registered books.
    pub fn catalog_summary(&self) -> CatalogResult<CatalogSummary> {
        Ok(self.books.catalog_summary()?)
    }
}

fn log_write_failure(event: &str, id: i64, err: &RepoError) {
    match err {
        RepoError::NotFound { entity, .. } => warn!(
            "event={} module=service status=not_found entity={} id={}",
            event, entity, id
        ),
        RepoError::ConcurrencyConflict { .. } => warn!(
            "event={} module=service status=conflict id={}",
            event, id
        ),
        RepoError::Validation(errors) => debug!(
            "event={} module=service status=invalid id={} error_count={}",
            event,
            id,
            errors.errors().len()
        ),
        _ => {}
    }
}
