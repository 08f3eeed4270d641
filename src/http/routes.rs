use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route("/interviews/start", post(handlers::start_interview))
        .route("/interviews/:session_id/start", post(handlers::restart_interview))
        .route("/interviews/:session_id/end", post(handlers::end_interview))
        // Turn actions
        .route("/interviews/:session_id/context", post(handlers::set_job_context))
        .route(
            "/interviews/:session_id/record/toggle",
            post(handlers::record_toggle),
        )
        .route("/interviews/:session_id/retry", post(handlers::retry_turn))
        .route("/interviews/:session_id/submit", post(handlers::submit_answer))
        .route(
            "/interviews/:session_id/continue",
            post(handlers::continue_interview),
        )
        // Microphone ingest
        .route("/interviews/:session_id/audio", post(handlers::push_audio))
        // Queries
        .route("/interviews/:session_id/status", get(handlers::get_status))
        .route(
            "/interviews/:session_id/transcript",
            get(handlers::get_transcript),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
