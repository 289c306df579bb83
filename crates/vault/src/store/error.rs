//! Store error kinds and their classification from driver errors.

use thiserror::Error;

/// Semantic failure classes the service branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// A referenced column does not exist in the table.
    UndefinedColumn,
    /// The store could not be reached or refused the connection.
    ConnectionFailure,
    /// A NOT NULL, unique, check, or foreign-key constraint rejected the write.
    ConstraintViolation,
    /// The object a DDL statement creates is already there, typically because
    /// a concurrent session created it first.
    AlreadyExists,
    Other,
}

/// A classified store failure. `message` is for server-side logs only.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_undefined_column(&self) -> bool {
        self.kind == StoreErrorKind::UndefinedColumn
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind == StoreErrorKind::AlreadyExists
    }
}

/// Catalog index hit when two sessions create the same table at once; the
/// loser sees a unique violation on its row type instead of 42P07.
const ROW_TYPE_NAME_INDEX: &str = "pg_type_typname_nsp_index";

/// Map a PostgreSQL SQLSTATE code to a [`StoreErrorKind`].
pub fn classify_sqlstate(code: &str) -> StoreErrorKind {
    match code {
        "42703" => StoreErrorKind::UndefinedColumn,
        // duplicate_table, duplicate_column, duplicate_object
        "42P07" | "42701" | "42710" => StoreErrorKind::AlreadyExists,
        c if c.starts_with("23") => StoreErrorKind::ConstraintViolation,
        // connection exception, insufficient resources, operator intervention
        c if c.starts_with("08") || c.starts_with("53") || c.starts_with("57P") => {
            StoreErrorKind::ConnectionFailure
        }
        _ => StoreErrorKind::Other,
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::Database(db) if db.constraint() == Some(ROW_TYPE_NAME_INDEX) => {
                StoreErrorKind::AlreadyExists
            }
            sqlx::Error::Database(db) => db
                .code()
                .map(|code| classify_sqlstate(&code))
                .unwrap_or(StoreErrorKind::Other),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreErrorKind::ConnectionFailure,
            _ => StoreErrorKind::Other,
        };
        Self::new(kind, err.to_string())
    }
}
