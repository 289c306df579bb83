//! Axum router construction.

use std::path::Path;

use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// With `static_dir`, unmatched requests are served from that directory and
/// fall through to the JSON 404 when no file matches.
pub fn build(state: AppState, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route(
            "/api/credentials",
            post(handlers::submit_credentials).fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/upload-fiel",
            post(handlers::upload_fiel).fallback(handlers::method_not_allowed),
        )
        .route("/health", get(handlers::health));

    let router = match static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).not_found_service(handlers::not_found.into_service()),
        ),
        None => router.fallback(handlers::not_found),
    };

    router
        .layer(DefaultBodyLimit::max(middleware::MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
