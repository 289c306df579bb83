//! Axum request handlers for all service endpoints.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header::ALLOW, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use common::protocol::{AckResponse, FailureResponse, HealthResponse};
use common::ServiceError;
use tracing::{debug, warn};

use super::{extract::CredentialBody, state::AppState};
use crate::intake::{self, Submission};

/// `POST /api/credentials` — store a subject id with its encrypted password.
pub async fn submit_credentials(
    State(state): State<AppState>,
    CredentialBody(body): CredentialBody,
) -> Response {
    match Submission::credential(body) {
        Ok(submission) => respond(&state, submission).await,
        Err(e) => failure(&e),
    }
}

/// `POST /api/upload-fiel` — store certificate and key files with the
/// encrypted key password.
///
/// Expects multipart parts `cer` and `key` (files) and `password` (text).
/// Unknown parts are ignored.
pub async fn upload_fiel(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            return failure(&ServiceError::BadRequest(format!(
                "invalid multipart body: {}",
                rejection.body_text()
            )));
        }
    };

    let (cer, key, password) = match read_fiel_parts(&mut multipart).await {
        Ok(parts) => parts,
        Err(e) => {
            return failure(&ServiceError::BadRequest(format!(
                "invalid multipart body: {}",
                e.body_text()
            )));
        }
    };

    match Submission::fiel(cer, key, password) {
        Ok(submission) => respond(&state, submission).await,
        Err(e) => failure(&e),
    }
}

/// `GET /health` — liveness check. Does not touch the database.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        status: "ok".into(),
    })
}

/// Any method other than `POST` on a submission route.
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(ALLOW, "POST")],
        Json(FailureResponse::new(
            "method_not_allowed",
            "Method Not Allowed",
        )),
    )
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = FailureResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

/// Render a [`ServiceError`] as the standard failure body.
pub fn failure(err: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(FailureResponse::from(err))).into_response()
}

async fn respond(state: &AppState, submission: Submission) -> Response {
    let table = submission.table().name;
    match intake::process(state.store.as_ref(), &state.codec, submission).await {
        Ok(_) => (StatusCode::OK, Json(AckResponse::ok())).into_response(),
        Err(e) => {
            warn!(table, status = e.http_status(), "submission rejected");
            failure(&e)
        }
    }
}

type FielParts = (Option<Bytes>, Option<Bytes>, Option<String>);

async fn read_fiel_parts(
    multipart: &mut Multipart,
) -> Result<FielParts, axum::extract::multipart::MultipartError> {
    let (mut cer, mut key, mut password) = (None, None, None);
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("cer") => cer = Some(field.bytes().await?),
            Some("key") => key = Some(field.bytes().await?),
            Some("password") => password = Some(field.text().await?),
            other => debug!(part = ?other, "ignoring multipart part"),
        }
    }
    Ok((cer, key, password))
}
