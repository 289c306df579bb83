//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::crypto::SecretCodec;
use crate::store::Store;

/// Application state shared across all request handlers.
///
/// Both fields are cheaply cloneable so Axum can clone the state per request.
#[derive(Clone)]
pub struct AppState {
    /// Relational store behind a bounded pool.
    pub store: Arc<dyn Store>,
    /// Codec holding the master passphrase.
    pub codec: SecretCodec,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, codec: SecretCodec) -> Self {
        Self { store, codec }
    }
}
