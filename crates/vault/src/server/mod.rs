//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Decode the two submission shapes (JSON/form and multipart) and hand them
//!   to [`crate::intake`].
//! - Normalise every outcome to `{"ok": ...}` JSON with the matching status.

pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
