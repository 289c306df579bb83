//! Relational store adapter.
//!
//! # Responsibilities
//!
//! - Expose the handful of schema and row operations the service needs behind
//!   the [`Store`] trait, so schema evolution and insert fallback can be
//!   exercised without a live database.
//! - Classify driver failures into a stable [`StoreErrorKind`] at this boundary;
//!   callers never inspect raw SQLSTATE codes.

pub mod error;
#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use error::{StoreError, StoreErrorKind};
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::schema::{ColumnSpec, TableSpec};

/// A value bound to one column of an insert.
#[derive(Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Bytes(Vec<u8>),
}

impl std::fmt::Debug for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Values may be credentials; only their shape is printed.
        match self {
            SqlValue::Text(s) => write!(f, "Text(len={})", s.len()),
            SqlValue::Bytes(b) => write!(f, "Bytes(len={})", b.len()),
        }
    }
}

/// Column/value pairs for a single insert, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRow {
    values: Vec<(&'static str, SqlValue)>,
}

impl NewRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &'static str, value: SqlValue) -> Self {
        self.values.push((column, value));
        self
    }

    /// Copy of this row without `column`.
    pub fn without(&self, column: &str) -> Self {
        Self {
            values: self
                .values
                .iter()
                .filter(|(name, _)| *name != column)
                .cloned()
                .collect(),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.iter().map(|(name, _)| *name)
    }

    pub fn values(&self) -> &[(&'static str, SqlValue)] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }
}

/// Encrypted secret as read back from a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSecret {
    pub payload: String,
    /// `None` for rows written before the IV column existed.
    pub iv: Option<String>,
}

/// Operations the service performs against the relational store.
///
/// Every schema operation must be idempotent: running it against a table that
/// already has the desired shape is a no-op or a classified error, never a
/// destructive change.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Create `table` with its full column set if it does not exist.
    async fn create_table(&self, table: &TableSpec) -> Result<(), StoreError>;

    /// Add `column` to `table` if it is missing.
    async fn add_column(&self, table: &str, column: &ColumnSpec) -> Result<(), StoreError>;

    /// Convert a binary `column` to text, re-encoding existing values as base64.
    ///
    /// Fails if the column is not binary.
    async fn convert_column_to_text(&self, table: &str, column: &str) -> Result<(), StoreError>;

    /// Insert `row` into `table`, returning the server-assigned id.
    async fn insert(&self, table: &str, row: &NewRow) -> Result<i64, StoreError>;

    /// Read the encrypted secret of row `id`.
    ///
    /// With `include_iv` false the IV column is not referenced and the result
    /// carries `iv: None`, which lets tables that predate the column be read.
    /// Callers go through [`crate::intake::read_secret`], which picks the mode.
    async fn fetch_secret(
        &self,
        table: &TableSpec,
        id: i64,
        include_iv: bool,
    ) -> Result<Option<StoredSecret>, StoreError>;
}
