//! # Error Types Module
//!
//! Structured errors for catalog validation and store access. Handler code
//! wraps these in `anyhow::Error` at the dispatcher boundary.

use thiserror::Error;

/// Validation failures for user-supplied names (categories and products)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// Name is empty or whitespace only
    #[error("name is empty")]
    Empty,
    /// Name collides with a reserved button label
    #[error("name '{0}' is reserved")]
    Reserved(String),
    /// Name exceeds the maximum number of characters
    #[error("name is longer than {max} characters")]
    TooLong { max: usize },
}

/// Errors returned by [`crate::catalog::CatalogStore`] implementations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid category name: {0}")]
    InvalidName(#[from] NameError),
    #[error("category '{0}' already exists")]
    DuplicateName(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CatalogError {
    /// True when the store rejected a write because of a unique constraint
    /// (e.g. renaming a category to a name that already exists).
    pub fn is_unique_violation(&self) -> bool {
        match self {
            CatalogError::DuplicateName(_) => true,
            CatalogError::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}
