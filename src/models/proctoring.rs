use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Tab switches and outcome of a session that reached a terminal phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProctoringRecord {
    pub student_email: String,
    pub exam_id: Uuid,
    pub tab_switches: u32,
    /// `true` when the session was ended by the strike policy.
    pub terminated: bool,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredProctoringRecord {
    pub id: Uuid,
    pub student_email: String,
    pub exam_id: Uuid,
    pub tab_switches: i32,
    pub terminated: bool,
    pub recorded_at: DateTime<Utc>,
}
