pub mod exams;
pub mod export;
pub mod health;
pub mod results;
pub mod sessions;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::auth::{require_auth, require_teacher};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let teacher_api = Router::new()
        .route("/api/exams", post(exams::create_exam))
        .route("/api/exams/:id", delete(exams::delete_exam))
        .route("/api/exams/import", post(exams::import_exam_questions))
        .route("/api/results", get(results::list_results))
        .route("/api/results/export", get(export::export_results))
        .route("/api/messages", get(results::list_messages))
        .layer(middleware::from_fn(require_teacher));

    let student_api = Router::new()
        .route("/api/exams", get(exams::list_exams))
        .route("/api/exams/:id", get(exams::get_exam))
        .route("/api/exams/:id/sessions", post(sessions::create_session))
        .route("/api/sessions/:id", get(sessions::get_session))
        .route("/api/sessions/:id/start", post(sessions::start_session))
        .route("/api/sessions/:id/answers", put(sessions::record_answer))
        .route("/api/sessions/:id/visibility-lost", post(sessions::visibility_lost))
        .route("/api/sessions/:id/fullscreen", post(sessions::fullscreen_changed))
        .route("/api/sessions/:id/events", post(sessions::replay_events))
        .route("/api/sessions/:id/submit", post(sessions::submit_session))
        .route("/api/sessions/:id/messages", post(sessions::send_message));

    let api = teacher_api
        .merge(student_api)
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
