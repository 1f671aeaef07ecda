pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Sessions
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route("/api/v1/sessions/:id", get(handlers::handle_get_session))
        .route(
            "/api/v1/sessions/:id/analyze",
            post(handlers::handle_analyze).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/v1/sessions/:id/clear", post(handlers::handle_clear))
        .route("/api/v1/sessions/:id/reset", post(handlers::handle_reset))
        .route(
            "/api/v1/sessions/:id/threshold",
            put(handlers::handle_set_threshold),
        )
        .route("/api/v1/sessions/:id/select", post(handlers::handle_select))
        .route(
            "/api/v1/sessions/:id/compare",
            put(handlers::handle_set_comparison),
        )
        // Entries
        .route(
            "/api/v1/sessions/:id/entries/:entry_id/notes",
            put(handlers::handle_update_notes),
        )
        .route(
            "/api/v1/sessions/:id/entries/:entry_id/report",
            get(handlers::handle_get_report),
        )
        // Downloads
        .route(
            "/api/v1/sessions/:id/export/:format",
            get(handlers::handle_export),
        )
        .with_state(state)
}
