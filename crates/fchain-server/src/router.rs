use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handler;
use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Build the axum router with all fchain endpoints.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let body_limit = usize::try_from(config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    Router::new()
        .route("/upload", post(handler::upload))
        .route("/chain", get(handler::chain))
        .route("/chain/verify", get(handler::verify))
        .route("/chain/status", get(handler::status))
        .route("/chain/sync", post(handler::sync))
        .route("/chain/:index", get(handler::block))
        .route("/health", get(handler::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
