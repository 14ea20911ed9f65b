//! Field-level validation results.
//!
//! # Responsibility
//! - Represent every violated field constraint of one write request.
//! - Share small length/range helpers between entity validators.
//!
//! # Invariants
//! - A `ValidationErrors` returned as `Err` is never empty.
//! - Lengths are measured in Unicode scalar values, matching SQLite `length()`.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Kind of constraint a field violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FieldErrorKind {
    /// Value is missing or blank.
    Required,
    /// Text exceeds its maximum length.
    TooLong { max: usize },
    /// Text length falls outside an inclusive range.
    LengthOutOfRange { min: usize, max: usize },
    /// Number falls outside an inclusive range.
    OutOfRange { min: i64, max: i64 },
    /// Referenced record does not exist.
    UnknownReference,
}

/// One violated constraint on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    #[serde(flatten)]
    pub kind: FieldErrorKind,
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            FieldErrorKind::Required => write!(f, "{} is required", self.field),
            FieldErrorKind::TooLong { max } => {
                write!(f, "{} must be at most {max} characters", self.field)
            }
            FieldErrorKind::LengthOutOfRange { min, max } => {
                write!(f, "{} must be {min} to {max} characters", self.field)
            }
            FieldErrorKind::OutOfRange { min, max } => {
                write!(f, "{} must be between {min} and {max}", self.field)
            }
            FieldErrorKind::UnknownReference => {
                write!(f, "{} does not reference an existing record", self.field)
            }
        }
    }
}

/// Ordered list of field errors collected for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a result holding exactly one field error.
    pub fn single(field: &'static str, kind: FieldErrorKind) -> Self {
        let mut errors = Self::new();
        errors.push(field, kind);
        errors
    }

    pub fn push(&mut self, field: &'static str, kind: FieldErrorKind) {
        self.errors.push(FieldError { field, kind });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns whether any error targets `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }

    /// Converts the collected errors into `Ok(())` when empty.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub(crate) fn require_text(&mut self, field: &'static str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.push(field, FieldErrorKind::Required);
        } else if value.chars().count() > max {
            self.push(field, FieldErrorKind::TooLong { max });
        }
    }

    pub(crate) fn optional_text(&mut self, field: &'static str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            if value.chars().count() > max {
                self.push(field, FieldErrorKind::TooLong { max });
            }
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl Error for ValidationErrors {}

/// Trims surrounding whitespace in place.
pub(crate) fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

/// Trims an optional text value and collapses blank input to `None`.
pub(crate) fn normalize_optional(value: &mut Option<String>) {
    if let Some(text) = value.as_mut() {
        trim_in_place(text);
        if text.is_empty() {
            *value = None;
        }
    }
}
