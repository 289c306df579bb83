//! `vault` — credential vault service entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise logging (and OTLP export when configured).
//! 3. Configure the bounded, lazily connecting PostgreSQL pool.
//! 4. Build the [`SecretCodec`] from the master passphrase.
//! 5. Build the Axum router and serve until Ctrl-C / SIGTERM.
//!
//! Table schemas are ensured per request, not at startup, so the service
//! comes up even while the database is unreachable.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use vault::config::Config;
use vault::crypto::SecretCodec;
use vault::server::{self, state::AppState};
use vault::store::PgStore;
use vault::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        "vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Database pool
    // -----------------------------------------------------------------------
    let store = PgStore::connect_lazy(&cfg)?;

    // -----------------------------------------------------------------------
    // 4. Codec
    // -----------------------------------------------------------------------
    let codec = SecretCodec::new(cfg.pgp_secret.as_bytes());

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(Arc::new(store.clone()), codec);
    let router = server::router::build(state, Some(Path::new(&cfg.static_dir)));

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    store.close().await;
    telemetry::shutdown_telemetry();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
