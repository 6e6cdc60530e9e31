use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub student_email: String,
    pub exam_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredMessage {
    pub id: Uuid,
    pub student_email: String,
    pub exam_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
