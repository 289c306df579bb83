//! The validate → ensure → encrypt → insert pipeline shared by both endpoints.
//!
//! # Failure classes
//!
//! - Validation happens in the [`Submission`] constructors, before any I/O.
//! - A failed schema ensure short-circuits before the key is derived.
//! - An insert that hits a missing IV column is retried once without it; any
//!   other store error propagates.

use bytes::Bytes;
use common::protocol::CredentialSubmission;
use common::ServiceError;
use tracing::{error, info, instrument, warn};
use zeroize::Zeroizing;

use crate::crypto::{EncodedSecret, SecretCodec};
use crate::schema::{SchemaEnsurer, TableSpec, CREDENTIALS, FIEL_UPLOADS};
use crate::store::{NewRow, SqlValue, Store, StoreError, StoreErrorKind, StoredSecret};

/// Validation message for the credential form.
pub const CREDENTIAL_FIELDS_REQUIRED: &str = "RFC and password are required";

/// Validation message for the FIEL upload.
pub const FIEL_FIELDS_REQUIRED: &str = "Faltan archivos o contraseña";

/// A validated write: plain columns, target table, and the secret to encrypt.
pub struct Submission {
    table: &'static TableSpec,
    fields: NewRow,
    secret: Zeroizing<String>,
}

impl std::fmt::Debug for Submission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submission")
            .field("table", &self.table.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl Submission {
    /// Validate a subject-id + password submission for `sat_credentials`.
    ///
    /// The subject id is trimmed; the password is kept verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] if either field is missing or blank.
    pub fn credential(body: CredentialSubmission) -> Result<Self, ServiceError> {
        let subject_id = body.subject_id.as_deref().map(str::trim).unwrap_or_default();
        let password = Zeroizing::new(body.password.unwrap_or_default());
        if subject_id.is_empty() || password.is_empty() {
            return Err(ServiceError::BadRequest(CREDENTIAL_FIELDS_REQUIRED.into()));
        }
        Ok(Self {
            table: &CREDENTIALS,
            fields: NewRow::new().with("rfc", SqlValue::Text(subject_id.to_owned())),
            secret: password,
        })
    }

    /// Validate a certificate + key + password upload for `fiel_uploads`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] if any part is missing or empty.
    pub fn fiel(
        cer: Option<Bytes>,
        key: Option<Bytes>,
        password: Option<String>,
    ) -> Result<Self, ServiceError> {
        let password = Zeroizing::new(password.unwrap_or_default());
        match (cer, key) {
            (Some(cer), Some(key)) if !cer.is_empty() && !key.is_empty() && !password.is_empty() => {
                Ok(Self {
                    table: &FIEL_UPLOADS,
                    fields: NewRow::new()
                        .with("cer", SqlValue::Bytes(cer.to_vec()))
                        .with("key", SqlValue::Bytes(key.to_vec())),
                    secret: password,
                })
            }
            _ => Err(ServiceError::BadRequest(FIEL_FIELDS_REQUIRED.into())),
        }
    }

    pub fn table(&self) -> &'static TableSpec {
        self.table
    }
}

/// Run the full pipeline for one submission and return the new row id.
///
/// # Errors
///
/// - [`ServiceError::Unavailable`] if the schema cannot be ensured or the
///   store is unreachable during the insert.
/// - [`ServiceError::EncryptionFailure`] if the codec fails.
/// - [`ServiceError::Internal`] for any other store error.
#[instrument(skip_all, fields(table = submission.table.name))]
pub async fn process(
    store: &dyn Store,
    codec: &SecretCodec,
    submission: Submission,
) -> Result<i64, ServiceError> {
    let Submission {
        table,
        fields,
        secret,
    } = submission;

    if let Err(e) = SchemaEnsurer::new(store).ensure(table).await {
        error!(error = %e, "schema ensure failed");
        return Err(ServiceError::Unavailable(e.to_string()));
    }

    let encoded = encrypt_blocking(codec, secret).await?;
    let row = fields
        .with(table.secret_column, SqlValue::Text(encoded.payload))
        .with(table.iv_column, SqlValue::Text(encoded.iv));

    let id = insert_row(store, table, &row).await.map_err(|e| {
        error!(error = %e, "insert failed");
        match e.kind {
            StoreErrorKind::ConnectionFailure => ServiceError::Unavailable(e.to_string()),
            _ => ServiceError::Internal(e.to_string()),
        }
    })?;

    info!(id, "credential stored");
    Ok(id)
}

/// Insert `row`, retrying once without the IV column if the table lacks it.
///
/// # Errors
///
/// Returns any [`StoreError`] other than the recovered undefined-column case.
pub async fn insert_row(
    store: &dyn Store,
    table: &TableSpec,
    row: &NewRow,
) -> Result<i64, StoreError> {
    match store.insert(table.name, row).await {
        Err(e) if e.is_undefined_column() && row.contains(table.iv_column) => {
            warn!(table = table.name, error = %e, "iv column missing; inserting without it");
            store.insert(table.name, &row.without(table.iv_column)).await
        }
        result => result,
    }
}

/// Read back the encrypted secret of row `id`, tolerating a missing IV column.
///
/// This is the read half of the pipeline: the result feeds
/// [`SecretCodec::decrypt_stored`]. No HTTP route exposes it; operators and
/// offline recovery tooling link against it through the library crate.
///
/// # Errors
///
/// Returns any [`StoreError`] other than the recovered undefined-column case.
pub async fn read_secret(
    store: &dyn Store,
    table: &TableSpec,
    id: i64,
) -> Result<Option<StoredSecret>, StoreError> {
    match store.fetch_secret(table, id, true).await {
        Err(e) if e.is_undefined_column() => store.fetch_secret(table, id, false).await,
        result => result,
    }
}

/// Derive the key and encrypt on the blocking pool; scrypt is CPU-bound.
async fn encrypt_blocking(
    codec: &SecretCodec,
    secret: Zeroizing<String>,
) -> Result<EncodedSecret, ServiceError> {
    let codec = codec.clone();
    tokio::task::spawn_blocking(move || codec.encrypt(secret.as_bytes()))
        .await
        .map_err(|e| ServiceError::Internal(format!("encryption task failed: {e}")))?
        .map_err(|e| {
            error!(error = %e, "encryption failed");
            ServiceError::EncryptionFailure(e.to_string())
        })
}
