//! Catalog domain model.
//!
//! # Responsibility
//! - Define the Category and Book records shared by store and service layers.
//! - Provide explicit, transport-independent validation per entity.
//!
//! # Invariants
//! - Ids are assigned by storage and never reused.
//! - A Category does not own its Books; the relation is derived by query.

pub mod book;
pub mod category;
pub mod validation;

/// Unix epoch milliseconds (UTC), the persisted timestamp representation.
pub type EpochMillis = i64;
