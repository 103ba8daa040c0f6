//! HTTP router construction.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health::health))
        .route("/batches/{id}/process", post(api::batches::process_batch))
        .route("/batches/{id}/progress", get(api::batches::progress))
        .route("/batches/{id}/stream", get(api::batches::stream))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
