use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, patch, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/habits", get(handlers::list_habits).post(handlers::create_habit))
        .route("/api/habits/reorder", post(handlers::reorder_habits))
        .route(
            "/api/habits/:id",
            patch(handlers::update_habit).delete(handlers::delete_habit),
        )
        .route("/api/habits/:id/archive", post(handlers::archive_habit))
        .route("/api/habits/:id/restore", post(handlers::restore_habit))
        .route("/api/completions/toggle", post(handlers::toggle_completion))
        .route("/api/today", get(handlers::get_today))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/trend", get(handlers::get_trend))
        .route("/api/heatmap", get(handlers::get_heatmap))
        .route("/api/streaks", get(handlers::get_streaks))
        .route("/api/export", get(handlers::export_document))
        .route("/api/import", post(handlers::import_document))
        .route("/api/data", delete(handlers::clear_data))
        .with_state(state)
}
