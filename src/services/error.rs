//! Service errors shared by the content services
//!
//! Database failures reach editors as readable messages: the raw driver
//! text is matched against a few known fragments and replaced with an
//! explanation. Anything unrecognised passes through unchanged.

use crate::services::date_range::DateRangeError;
use crate::services::staging::StagingError;
use crate::storage::StorageError;

/// Error type for content service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Record not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uniqueness or referential conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Object storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Staged upload failure
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Wrap a repository write failure, see [`classify`](Self::classify)
    pub fn db(err: anyhow::Error) -> Self {
        ServiceError::Internal(err).classify()
    }

    /// Reclassify an internal error by its database message: unique and
    /// foreign key violations become conflicts.
    pub fn classify(self) -> Self {
        match self {
            ServiceError::Internal(err) => {
                let raw = format!("{:#}", err);
                match DbErrorKind::of(&raw) {
                    Some(DbErrorKind::UniqueViolation) | Some(DbErrorKind::ForeignKeyViolation) => {
                        ServiceError::Conflict(friendly_message(&raw))
                    }
                    _ => ServiceError::Internal(err),
                }
            }
            other => other,
        }
    }
}

impl From<DateRangeError> for ServiceError {
    fn from(err: DateRangeError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

/// Database failure categories recognised in driver messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    MissingTable,
    PermissionDenied,
    UniqueViolation,
    ForeignKeyViolation,
}

impl DbErrorKind {
    /// Classify a raw driver message (SQLite, MySQL or PostgreSQL wording)
    pub fn of(raw: &str) -> Option<Self> {
        let lower = raw.to_lowercase();
        if (lower.contains("relation") && lower.contains("does not exist"))
            || lower.contains("no such table")
            || (lower.contains("table") && lower.contains("doesn't exist"))
        {
            Some(DbErrorKind::MissingTable)
        } else if lower.contains("permission denied") || lower.contains("access denied") {
            Some(DbErrorKind::PermissionDenied)
        } else if lower.contains("unique constraint")
            || lower.contains("duplicate entry")
            || lower.contains("duplicate key")
        {
            Some(DbErrorKind::UniqueViolation)
        } else if lower.contains("foreign key") {
            Some(DbErrorKind::ForeignKeyViolation)
        } else {
            None
        }
    }
}

/// Replace a known database error with an editor-facing explanation
pub fn friendly_message(raw: &str) -> String {
    match DbErrorKind::of(raw) {
        Some(DbErrorKind::MissingTable) => {
            "The database is not set up for this content yet. Run the migrations and try again."
                .to_string()
        }
        Some(DbErrorKind::PermissionDenied) => {
            "Permission denied: the database account cannot modify this content.".to_string()
        }
        Some(DbErrorKind::UniqueViolation) => {
            "A record with the same unique value (such as the slug) already exists.".to_string()
        }
        Some(DbErrorKind::ForeignKeyViolation) => {
            "This record references, or is referenced by, another record that prevents the change."
                .to_string()
        }
        None => raw.to_string(),
    }
}
