//! Table shapes and idempotent, additive schema evolution.
//!
//! # Module invariants
//!
//! - **Forward-only.** Nothing here drops a table or column or narrows a type.
//! - **Idempotent.** Every statement tolerates already-applied state, so
//!   concurrent requests may run [`SchemaEnsurer::ensure`] at the same time
//!   without locking.

pub mod ensure;
pub mod table;

pub use ensure::SchemaEnsurer;
pub use table::{ColumnSpec, ColumnType, TableSpec, CREDENTIALS, FIEL_UPLOADS};
