use axum::{extract::State, response::Json};

use crate::error::Result;
use crate::models::message::StoredMessage;
use crate::services::result_service::{group_results_by_exam, ExamResults};
use crate::AppState;

#[axum::debug_handler]
pub async fn list_results(State(state): State<AppState>) -> Result<Json<Vec<ExamResults>>> {
    let exams = state.catalog.list_exams().await?;
    let results = state.catalog.list_results().await?;
    let proctoring = state.catalog.list_proctoring().await?;
    Ok(Json(group_results_by_exam(&exams, &results, &proctoring)))
}

#[axum::debug_handler]
pub async fn list_messages(State(state): State<AppState>) -> Result<Json<Vec<StoredMessage>>> {
    Ok(Json(state.catalog.list_messages().await?))
}
