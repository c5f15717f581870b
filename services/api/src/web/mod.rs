pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    routing::{delete, get},
    Router,
};
use rest::{
    delete_feedback_handler, get_course_handler, get_preferences_handler, health_handler,
    list_courses_handler, list_feedback_handler, recommend_default_handler, recommend_handler,
    similar_courses_handler, submit_feedback_handler, update_preferences_handler,
};
use state::AppState;
use std::sync::Arc;

/// Builds the API routes. CORS, tracing and the Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/courses", get(list_courses_handler))
        .route("/courses/{course_id}", get(get_course_handler))
        .route("/courses/{course_id}/similar", get(similar_courses_handler))
        .route(
            "/recommendations/{user_id}",
            get(recommend_default_handler).post(recommend_handler),
        )
        .route(
            "/users/{user_id}/preferences",
            get(get_preferences_handler).put(update_preferences_handler),
        )
        .route(
            "/users/{user_id}/feedback",
            get(list_feedback_handler).post(submit_feedback_handler),
        )
        .route(
            "/users/{user_id}/feedback/{feedback_id}",
            delete(delete_feedback_handler),
        )
        .with_state(app_state)
}
