//! Catalog Store: repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for categories and books.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate drafts before SQL mutations.
//! - Each mutating call commits all of its changes or none of them.
//! - Repository APIs return semantic errors (`NotFound`, `ReferentialConflict`,
//!   `ConcurrencyConflict`) in addition to DB transport errors.

pub mod book_repo;
pub mod category_repo;
pub mod error;
