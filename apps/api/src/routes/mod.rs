pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::assets;
use crate::screening::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // Upload relay
        .route(
            "/api/upload",
            post(assets::handlers::handle_upload).layer(upload_limit),
        )
        // Screening session
        .route(
            "/api/v1/screenings",
            post(handlers::handle_start_screening).layer(upload_limit),
        )
        .route(
            "/api/v1/screenings/current",
            get(handlers::handle_current_session),
        )
        .route("/api/v1/screenings/reset", post(handlers::handle_reset))
        // History
        .route("/api/v1/history", get(handlers::handle_list_history))
        .route("/api/v1/history/:id", get(handlers::handle_select_history))
        .with_state(state)
}
