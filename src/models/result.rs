use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Outcome of one completed session, written once to the exam store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub student_email: String,
    pub exam_id: Uuid,
    pub score: u32,
    pub total_questions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredResult {
    pub id: Uuid,
    pub student_email: String,
    pub exam_id: Uuid,
    pub score: i32,
    pub total_questions: i32,
    pub created_at: DateTime<Utc>,
}
