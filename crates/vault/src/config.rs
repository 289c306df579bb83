//! Configuration loading and validation for the vault service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::postgres::PgSslMode;

/// Validated service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// PostgreSQL connection string. **Required.**
    pub database_url: String,

    /// Master passphrase the encryption key is derived from. **Required.**
    pub pgp_secret: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound of the connection pool (1–3).
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// How long a request waits for a pooled connection before failing with 503.
    #[serde(default = "default_db_acquire_timeout")]
    pub db_acquire_timeout_secs: u64,

    /// Idle pooled connections are closed after this many seconds.
    #[serde(default = "default_db_idle_timeout")]
    pub db_idle_timeout_secs: u64,

    /// libpq-style sslmode (`disable`, `prefer`, `require`, ...). Defaults to `require`:
    /// always encrypted, certificate not verified.
    #[serde(default = "default_db_ssl_mode")]
    pub db_ssl_mode: String,

    /// Directory of static assets served for unmatched `GET` requests.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// OTLP endpoint for span export. Logs only when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    3000
}
fn default_db_max_connections() -> u32 {
    3
}
fn default_db_acquire_timeout() -> u64 {
    5
}
fn default_db_idle_timeout() -> u64 {
    10
}
fn default_db_ssl_mode() -> String {
    "require".into()
}
fn default_static_dir() -> String {
    "public".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("pgp_secret", &"[REDACTED]")
            .field("port", &self.port)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("db_idle_timeout_secs", &self.db_idle_timeout_secs)
            .field("db_ssl_mode", &self.db_ssl_mode)
            .field("static_dir", &self.static_dir)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.database_url, "DATABASE_URL")?;
        ensure_non_empty(&self.pgp_secret, "PGP_SECRET")?;

        if !(1..=3).contains(&self.db_max_connections) {
            anyhow::bail!("DB_MAX_CONNECTIONS must be between 1 and 3");
        }
        if self.db_acquire_timeout_secs == 0 {
            anyhow::bail!("DB_ACQUIRE_TIMEOUT_SECS must be > 0");
        }
        PgSslMode::from_str(&self.db_ssl_mode)
            .map_err(|_| anyhow::anyhow!("DB_SSL_MODE is not a valid sslmode: {}", self.db_ssl_mode))?;
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
