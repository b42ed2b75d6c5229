//! Error types for cathedra
//!
//! One taxonomy for the whole crate: core operations return `Result<T>` and
//! the HTTP layer maps each variant to a status code. The message inside a
//! variant is what the caller sees in the `detail` field.

use hyper::StatusCode;
use thiserror::Error;

/// Cathedra error taxonomy
#[derive(Debug, Error)]
pub enum CathedraError {
    /// Referenced entity absent, including owner-scoped lookups that hide
    /// other owners' records
    #[error("{0}")]
    NotFound(String),

    /// Caller lacks the role or ownership/membership relation to the target
    #[error("{0}")]
    Forbidden(String),

    /// Malformed or missing required input
    #[error("{0}")]
    Validation(String),

    /// State-invariant violation: duplicate active submission, wrong-state
    /// transition, concurrent-approval loser, non-deletable topic
    #[error("{0}")]
    Conflict(String),

    /// Missing or malformed identity headers at the gateway boundary
    #[error("{0}")]
    Unauthorized(String),

    /// Snapshot I/O fault or a dangling reference inside the stored world
    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed request body or query at the HTTP boundary
    #[error("{0}")]
    Http(String),
}

impl CathedraError {
    /// HTTP status code for this error. Conflict maps to 400 alongside
    /// validation; the upstream surface does not distinguish them.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CathedraError::NotFound(_) => StatusCode::NOT_FOUND,
            CathedraError::Forbidden(_) => StatusCode::FORBIDDEN,
            CathedraError::Validation(_) => StatusCode::BAD_REQUEST,
            CathedraError::Conflict(_) => StatusCode::BAD_REQUEST,
            CathedraError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CathedraError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CathedraError::Http(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether this is a conflict (used by tests asserting racer outcomes)
    pub fn is_conflict(&self) -> bool {
        matches!(self, CathedraError::Conflict(_))
    }
}

impl From<std::io::Error> for CathedraError {
    fn from(e: std::io::Error) -> Self {
        CathedraError::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CathedraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            CathedraError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CathedraError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            CathedraError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CathedraError::Conflict("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CathedraError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            CathedraError::Storage("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_detail_message_passthrough() {
        let err = CathedraError::Conflict("topic is already taken".into());
        assert_eq!(err.to_string(), "topic is already taken");
        assert!(err.is_conflict());
    }
}
