//! Core domain logic for the personal book catalog.
//! This crate is the single source of truth for catalog invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{CatalogConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::book::{Book, BookDraft, BookId, BookWithCategory, ReadingStatus};
pub use model::category::{Category, CategoryDraft, CategoryId, CategoryWithBooks};
pub use model::validation::{FieldError, FieldErrorKind, ValidationErrors};
pub use model::EpochMillis;
pub use repo::book_repo::{
    BookFilter, BookRepository, CatalogSummary, ConcurrencyMode, SqliteBookRepository, TextMatch,
};
pub use repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
pub use repo::error::{Entity, RepoError, RepoResult};
pub use service::catalog_service::{
    BookQuery, CatalogError, CatalogResult, CatalogService, SqliteCatalogService,
};

/// Minimal health-check API for shell integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
