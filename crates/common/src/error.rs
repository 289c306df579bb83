//! Common error types shared across crates.

use thiserror::Error;

/// Message returned to callers when the backing store cannot be reached.
pub const STORE_UNAVAILABLE_MESSAGE: &str = "Base de datos no disponible. Intenta más tarde.";

/// Message returned to callers for any failure whose detail stays server-side.
pub const INTERNAL_ERROR_MESSAGE: &str = "Server error";

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::EncryptionFailure`] → 500
/// - [`ServiceError::Unavailable`] → 503
/// - [`ServiceError::Internal`] → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Required input is missing, empty, or could not be decoded.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Key derivation or encryption failed.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// The backing store could not be reached or its schema could not be ensured.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::EncryptionFailure(_) => 500,
            ServiceError::Unavailable(_) => 503,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for the failure class.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::EncryptionFailure(_) | ServiceError::Internal(_) => "internal_error",
            ServiceError::Unavailable(_) => "service_unavailable",
        }
    }

    /// Message that is safe to show to the caller.
    ///
    /// Validation messages are passed through verbatim; everything else is
    /// replaced by a fixed message so internal detail never leaks.
    pub fn public_message(&self) -> &str {
        match self {
            ServiceError::BadRequest(msg) => msg,
            ServiceError::Unavailable(_) => STORE_UNAVAILABLE_MESSAGE,
            ServiceError::EncryptionFailure(_) | ServiceError::Internal(_) => {
                INTERNAL_ERROR_MESSAGE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(
            ServiceError::EncryptionFailure("x".into()).http_status(),
            500
        );
        assert_eq!(ServiceError::Unavailable("x".into()).http_status(), 503);
        assert_eq!(ServiceError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::BadRequest("RFC and password are required".into());
        assert!(e.to_string().contains("RFC and password are required"));
    }

    #[test]
    fn public_message_hides_internal_detail() {
        let e = ServiceError::Internal("relation \"sat_credentials\" is locked".into());
        assert_eq!(e.public_message(), INTERNAL_ERROR_MESSAGE);

        let e = ServiceError::Unavailable("pool timed out".into());
        assert_eq!(e.public_message(), STORE_UNAVAILABLE_MESSAGE);
        assert_eq!(e.code(), "service_unavailable");
    }
}
