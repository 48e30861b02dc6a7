use thiserror::Error;

use crate::operator::Operator;

/// Structural problems with a filter.
///
/// These are raised synchronously by the `validate` methods and are never
/// auto-corrected. Out-of-range paging input is not a structural problem;
/// it is clamped instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Condition field cannot be empty")]
    EmptyField,

    #[error("Operator {operator} on field '{field}' requires a value")]
    MissingValue { field: String, operator: Operator },

    #[error("Operator {operator} on field '{field}' requires a two-element range")]
    InvalidRange { field: String, operator: Operator },

    #[error("Order by field cannot be empty")]
    EmptySortField,
}

impl ValidationError {
    /// Name of the offending field, when the error carries one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingValue { field, .. }
            | ValidationError::InvalidRange { field, .. } => Some(field),
            ValidationError::EmptyField | ValidationError::EmptySortField => None,
        }
    }
}

/// Errors surfaced through the [`Repository`](crate::repository::Repository) contract.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A lookup that must return exactly one row matched nothing.
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid filter: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
