use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/habits/:id/toggle", post(handlers::toggle_form))
        .route("/api/today", get(handlers::get_today))
        .route(
            "/api/habits",
            get(handlers::list_habits).post(handlers::create_habit),
        )
        .route(
            "/api/habits/:id",
            get(handlers::get_habit)
                .patch(handlers::update_habit)
                .delete(handlers::delete_habit),
        )
        .route("/api/habits/:id/archive", post(handlers::archive_habit))
        .route("/api/habits/:id/restore", post(handlers::restore_habit))
        .route(
            "/api/habits/:id/check-ins",
            get(handlers::list_check_ins).post(handlers::toggle_check_in),
        )
        .route("/api/habits/:id/streak", get(handlers::get_streak))
        .route("/api/check-ins/:id/mood", put(handlers::set_mood))
        .route("/api/check-ins/:id/note", put(handlers::set_note))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/achievements", get(handlers::get_achievements))
        .route(
            "/api/journal",
            get(handlers::list_journal).post(handlers::create_journal),
        )
        .route(
            "/api/journal/:id",
            axum::routing::patch(handlers::update_journal).delete(handlers::delete_journal),
        )
        .route(
            "/api/coaching",
            get(handlers::get_coaching)
                .post(handlers::generate_coaching)
                .delete(handlers::clear_coaching),
        )
        .route("/api/coaching/read-all", post(handlers::mark_all_coaching_read))
        .route("/api/coaching/:id/read", post(handlers::mark_coaching_read))
        .route(
            "/api/coaching/:id",
            axum::routing::delete(handlers::delete_coaching),
        )
        .route("/api/notifications", get(handlers::drain_notifications))
        .route(
            "/api/preferences",
            get(handlers::get_preferences).put(handlers::put_preferences),
        )
        .with_state(state)
}
