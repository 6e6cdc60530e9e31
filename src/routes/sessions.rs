use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;

use crate::dto::session_dto::{
    BrowserEvent, BrowserEventsRequest, BrowserEventsResponse, CreateSessionResponse,
    FullscreenRequest, ProctoringEventResponse, RecordAnswerRequest, RejectedEvent,
    SendMessageRequest, SendMessageResponse, StartSessionResponse, SubmitResponse,
};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::session::SessionSnapshot;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
) -> Result<Response> {
    let entry = state.sessions.open_session(claims.identity(), exam_id).await?;
    let snapshot = entry.handle.snapshot().await?;

    let response = CreateSessionResponse {
        session_id: entry.handle.id(),
        phase: snapshot.phase,
        exam: (*entry.exam).clone(),
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>> {
    let entry = state.sessions.owned_session(session_id, &claims.sub)?;
    Ok(Json(entry.handle.snapshot().await?))
}

#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<StartSessionResponse>> {
    let entry = state.sessions.owned_session(session_id, &claims.sub)?;
    entry.handle.start().await?;

    Ok(Json(StartSessionResponse {
        fullscreen_required: entry.environment.fullscreen_requested(),
        session: entry.handle.snapshot().await?,
    }))
}

#[axum::debug_handler]
pub async fn record_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<RecordAnswerRequest>,
) -> Result<Json<SessionSnapshot>> {
    let entry = state.sessions.owned_session(session_id, &claims.sub)?;
    entry.handle.record_answer(req.question_index, req.value).await?;
    Ok(Json(entry.handle.snapshot().await?))
}

#[axum::debug_handler]
pub async fn visibility_lost(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ProctoringEventResponse>> {
    let entry = state.sessions.owned_session(session_id, &claims.sub)?;
    let signal = entry.handle.visibility_lost().await?;

    Ok(Json(ProctoringEventResponse {
        signal: Some(signal),
        session: entry.handle.snapshot().await?,
    }))
}

#[axum::debug_handler]
pub async fn fullscreen_changed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<FullscreenRequest>,
) -> Result<Json<ProctoringEventResponse>> {
    let entry = state.sessions.owned_session(session_id, &claims.sub)?;
    let signal = entry.handle.fullscreen_changed(req.is_fullscreen).await?;

    Ok(Json(ProctoringEventResponse {
        signal: Some(signal),
        session: entry.handle.snapshot().await?,
    }))
}

/// Applies a batch of queued browser events in order and returns the signal
/// each one produced. Application stops at the first event the session
/// rejects; if that is the first event the request fails with its error.
#[axum::debug_handler]
pub async fn replay_events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<BrowserEventsRequest>,
) -> Result<Json<BrowserEventsResponse>> {
    let entry = state.sessions.owned_session(session_id, &claims.sub)?;

    let mut signals = Vec::with_capacity(req.events.len());
    let mut rejected = None;
    for (index, event) in req.events.iter().enumerate() {
        let outcome = match event {
            BrowserEvent::VisibilityHidden => entry.handle.visibility_lost().await,
            BrowserEvent::FullscreenChange { is_fullscreen } => {
                entry.handle.fullscreen_changed(*is_fullscreen).await
            }
        };

        match outcome {
            Ok(signal) => signals.push(signal),
            Err(e) if index == 0 => return Err(e),
            Err(e) => {
                tracing::info!(
                    session_id = %session_id,
                    "Replay stopped at event {} of {}: {}",
                    index,
                    req.events.len(),
                    e
                );
                rejected = Some(RejectedEvent {
                    index,
                    error: e.kind().to_string(),
                    message: e.to_string(),
                });
                break;
            }
        }
    }

    Ok(Json(BrowserEventsResponse {
        signals,
        rejected,
        session: entry.handle.snapshot().await?,
    }))
}

#[axum::debug_handler]
pub async fn submit_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SubmitResponse>> {
    tracing::info!("Submitting session {}", session_id);
    let entry = state.sessions.owned_session(session_id, &claims.sub)?;
    let score = entry.handle.submit().await?;

    Ok(Json(SubmitResponse {
        score: score.correct,
        total_questions: score.total,
        message: "Your answers have been submitted successfully.".to_string(),
    }))
}

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Response> {
    let entry = state.sessions.owned_session(session_id, &claims.sub)?;
    let record = entry.handle.send_message(req.content).await?;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            sent: true,
            created_at: record.created_at,
        }),
    )
        .into_response())
}
