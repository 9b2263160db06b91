//! Common error types shared across crates.

use thiserror::Error;

/// Error surfaced by the loopback HTTP API.
///
/// Codec operations never fail from the caller's point of view, so these
/// variants only describe problems with the request itself:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::NotFound`] → 404
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request body was not valid JSON or did not match the expected shape.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No route matches the requested path.
    #[error("not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound(_) => 404,
        }
    }

    /// Short machine-readable code placed in [`crate::protocol::ErrorResponse::code`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::NotFound(_) => "not_found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(ServiceError::NotFound("x".into()).http_status(), 404);
    }

    #[test]
    fn codes_are_snake_case() {
        assert_eq!(ServiceError::BadRequest("x".into()).code(), "bad_request");
        assert_eq!(ServiceError::NotFound("x".into()).code(), "not_found");
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::BadRequest("expected value at line 1".into());
        assert!(e.to_string().contains("expected value at line 1"));
    }
}
