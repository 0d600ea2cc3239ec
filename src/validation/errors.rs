//! # Validation Errors
//!
//! Document-level violations are not errors here: they are collected in an
//! [`ErrorReport`](super::ErrorReport). These types cover the cases where a
//! run cannot produce a report at all.

use thiserror::Error;

use super::flatten::PathError;

/// Result type for validation runs
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Failures that abort a validation run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Malformed document: {0}")]
    MalformedDocument(#[from] PathError),

    #[error("Uniqueness lookup failed for '{path}': {source}")]
    Lookup {
        path: String,
        #[source]
        source: LookupError,
    },
}

impl ValidationError {
    /// Lookup failures may succeed on retry; malformed documents never do.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ValidationError::Lookup {
                source: LookupError::Unavailable(_),
                ..
            }
        )
    }
}

/// Errors raised by a duplicate lookup backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Lookup backend unavailable: {0}")]
    Unavailable(String),

    #[error("Lookup failed: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_display() {
        let err = ValidationError::Lookup {
            path: "email".into(),
            source: LookupError::Unavailable("connection refused".into()),
        };
        assert_eq!(
            err.to_string(),
            "Uniqueness lookup failed for 'email': Lookup backend unavailable: connection refused"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_malformed_document_from_path_error() {
        let err: ValidationError = PathError::MalformedPath("a..b".into()).into();
        assert!(matches!(err, ValidationError::MalformedDocument(_)));
        assert!(!err.is_retryable());
    }
}
