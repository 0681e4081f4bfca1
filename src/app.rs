use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/analyze", post(handlers::analyze))
        .route("/api/dates", get(handlers::get_dates))
        .route("/api/analysis", post(handlers::post_analysis))
        .route("/health", get(handlers::health))
        .with_state(state)
}
