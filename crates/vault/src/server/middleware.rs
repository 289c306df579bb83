//! Limits applied to the router alongside tracing, compression, and request ids.

use std::time::Duration;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest accepted request body. Certificate and key files are a few KiB.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;
