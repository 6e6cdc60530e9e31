use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::exam::StudentExamView;
use crate::session::{Phase, SessionSnapshot, Signal};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub phase: Phase,
    pub exam: StudentExamView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    /// The browser must enter fullscreen before showing questions.
    pub fullscreen_required: bool,
    pub session: SessionSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordAnswerRequest {
    pub question_index: i64,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullscreenRequest {
    pub is_fullscreen: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProctoringEventResponse {
    pub signal: Option<Signal>,
    pub session: SessionSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub score: u32,
    pub total_questions: u32,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub sent: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Browser event reported after the fact, e.g. queued while the tab was hidden.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowserEvent {
    VisibilityHidden,
    FullscreenChange { is_fullscreen: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEventsRequest {
    pub events: Vec<BrowserEvent>,
}

/// First event of a batch the session refused; later events were not applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedEvent {
    pub index: usize,
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEventsResponse {
    /// One signal per applied event, in order.
    pub signals: Vec<Signal>,
    pub rejected: Option<RejectedEvent>,
    pub session: SessionSnapshot,
}
