//! Structured logging, with optional OTLP span export.
//!
//! # Telemetry invariants
//!
//! - **No secrets, subject identifiers, or key material** in any span attribute
//!   or log field. Row ids and table names are fine.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};
