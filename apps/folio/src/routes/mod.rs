pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::preview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/paginate", post(handlers::handle_paginate))
        .route("/api/v1/previews", post(handlers::handle_open_preview))
        .route(
            "/api/v1/previews/:id",
            axum::routing::delete(handlers::handle_close_preview),
        )
        .route(
            "/api/v1/previews/:id/snapshot",
            put(handlers::handle_submit_snapshot),
        )
        .route(
            "/api/v1/previews/:id/font-ready",
            post(handlers::handle_font_ready),
        )
        .route("/api/v1/previews/:id/pages", get(handlers::handle_get_pages))
        .with_state(state)
}
