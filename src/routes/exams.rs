use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::exam_dto::{CreateExamPayload, CreateExamResponse, ImportQuestionsPayload};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::models::exam::{ExamSummary, NewExam, StudentExamView};
use crate::services::exam_service::{exam_link, validate_new_exam};
use crate::services::import_service::{import_questions, ImportReport};
use crate::AppState;

#[axum::debug_handler]
pub async fn list_exams(State(state): State<AppState>) -> Result<Json<Vec<ExamSummary>>> {
    Ok(Json(state.catalog.list_exams().await?))
}

#[axum::debug_handler]
pub async fn get_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<Uuid>,
) -> Result<Json<StudentExamView>> {
    let exam = state.store.load_exam(exam_id).await?;
    Ok(Json(exam.student_view()))
}

#[axum::debug_handler]
pub async fn create_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamPayload>,
) -> Result<Response> {
    payload.validate()?;

    let new_exam = NewExam {
        name: payload.name,
        questions: payload.questions.into_iter().map(Into::into).collect(),
        created_by: claims.email.clone(),
    };
    validate_new_exam(&new_exam)?;

    let exam = state.catalog.create_exam(new_exam).await?;
    tracing::info!(exam_id = %exam.id, teacher = %claims.email, "Exam created");

    let response = CreateExamResponse {
        id: exam.id,
        name: exam.name.clone(),
        question_count: exam.question_count(),
        link: exam_link(exam.id),
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

#[axum::debug_handler]
pub async fn delete_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.catalog.delete_exam(exam_id).await?;
    tracing::info!(exam_id = %exam_id, "Exam deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Turns decoded spreadsheet rows into questions for the authoring form.
/// Nothing is persisted.
#[axum::debug_handler]
pub async fn import_exam_questions(
    Json(payload): Json<ImportQuestionsPayload>,
) -> Result<Json<ImportReport>> {
    Ok(Json(import_questions(&payload.rows)))
}
