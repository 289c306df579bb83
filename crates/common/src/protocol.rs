//! Request and response types exchanged over the public HTTP API.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Credential submission
// ---------------------------------------------------------------------------

/// Body of `POST /api/credentials`, accepted as JSON or as a urlencoded form.
///
/// Both fields are optional at the decoding layer so that a missing field is
/// reported with the same validation message as an empty one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialSubmission {
    /// Subject identifier, usually a tax ID (RFC).
    #[serde(
        default,
        rename = "subjectId",
        alias = "rfc",
        alias = "subject_id"
    )]
    pub subject_id: Option<String>,

    /// Secret to encrypt before it is stored.
    #[serde(default)]
    pub password: Option<String>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Successful acknowledgment: `{"ok": true}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureResponse {
    /// Always `false`.
    pub ok: bool,
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub error: String,
}

impl FailureResponse {
    /// Construct a [`FailureResponse`] from a code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            code: code.into(),
            error: error.into(),
        }
    }
}

impl From<&crate::ServiceError> for FailureResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.public_message())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    /// Overall service status.
    pub status: String,
}
