//! Query & Mutation Service.
//!
//! # Responsibility
//! - Apply business rules that are not column constraints: filter
//!   composition, restrict-on-delete, concurrency-safe edits, audit stamps.
//! - Keep shell layers (UI/API/CLI) decoupled from storage details.
//!
//! # Invariants
//! - Services hold no durable state between calls.

pub mod catalog_service;
