//! Body extractor for `POST /api/credentials`.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    response::Response,
    Form, Json,
};
use common::protocol::CredentialSubmission;
use common::ServiceError;

use super::handlers::failure;

/// A [`CredentialSubmission`] decoded from either a JSON or a urlencoded body.
///
/// Undecodable bodies are rejected with the standard `{"ok": false}` failure.
#[derive(Debug)]
pub struct CredentialBody(pub CredentialSubmission);

#[async_trait]
impl<S> FromRequest<S> for CredentialBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let decoded = if is_form {
            Form::<CredentialSubmission>::from_request(req, state)
                .await
                .map(|Form(body)| body)
                .map_err(|rejection| rejection.body_text())
        } else {
            Json::<CredentialSubmission>::from_request(req, state)
                .await
                .map(|Json(body)| body)
                .map_err(|rejection| rejection.body_text())
        };

        decoded.map(Self).map_err(|detail| {
            failure(&ServiceError::BadRequest(format!(
                "invalid request body: {detail}"
            )))
        })
    }
}
