//! Credential vault: accepts credentials over HTTP, encrypts the secret with a
//! key derived from the server's master passphrase, and persists the result to
//! PostgreSQL tables that evolve additively.

pub mod config;
pub mod crypto;
pub mod intake;
pub mod schema;
pub mod server;
pub mod store;
pub mod telemetry;
