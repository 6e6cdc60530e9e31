use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::exam::{ExamDefinition, ExamSummary, NewExam, Question};
use crate::models::message::{MessageRecord, StoredMessage};
use crate::models::proctoring::{ProctoringRecord, StoredProctoringRecord};
use crate::models::result::{ResultRecord, StoredResult};
use crate::services::exam_service::ExamCatalog;
use crate::session::collaborators::ExamStore;

#[derive(Debug, FromRow)]
struct ExamRow {
    id: Uuid,
    name: String,
    questions: Json<Vec<Question>>,
    created_at: DateTime<Utc>,
}

impl ExamRow {
    fn into_definition(self) -> ExamDefinition {
        ExamDefinition {
            id: self.id,
            name: self.name,
            questions: self.questions.0,
        }
    }

    fn summary(&self) -> ExamSummary {
        ExamSummary {
            id: self.id,
            name: self.name.clone(),
            question_count: self.questions.0.len(),
            created_at: self.created_at,
        }
    }
}

fn to_db_count(value: u32, field: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::Validation(format!("{} is too large: {}", field, value)))
}

#[derive(Clone)]
pub struct PgExamStore {
    pool: PgPool,
}

impl PgExamStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExamStore for PgExamStore {
    async fn load_exam(&self, exam_id: Uuid) -> Result<ExamDefinition> {
        let row = sqlx::query_as::<_, ExamRow>(
            r#"SELECT id, name, questions, created_at FROM exams WHERE id = $1"#,
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Exam not found".to_string()))?;

        Ok(row.into_definition())
    }

    async fn submit_result(&self, record: ResultRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO results (student_email, exam_id, score, total_questions)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&record.student_email)
        .bind(record.exam_id)
        .bind(to_db_count(record.score, "score")?)
        .bind(to_db_count(record.total_questions, "total_questions")?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn submit_message(&self, record: MessageRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO exam_messages (student_email, exam_id, content, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&record.student_email)
        .bind(record.exam_id)
        .bind(&record.content)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_proctoring(&self, record: ProctoringRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO proctoring_records (student_email, exam_id, tab_switches, terminated, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&record.student_email)
        .bind(record.exam_id)
        .bind(to_db_count(record.tab_switches, "tab_switches")?)
        .bind(record.terminated)
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ExamCatalog for PgExamStore {
    async fn create_exam(&self, exam: NewExam) -> Result<ExamDefinition> {
        let row = sqlx::query_as::<_, ExamRow>(
            r#"
            INSERT INTO exams (name, questions, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, name, questions, created_at
            "#,
        )
        .bind(&exam.name)
        .bind(Json(&exam.questions))
        .bind(&exam.created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_definition())
    }

    async fn list_exams(&self) -> Result<Vec<ExamSummary>> {
        let rows = sqlx::query_as::<_, ExamRow>(
            r#"SELECT id, name, questions, created_at FROM exams ORDER BY created_at ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(ExamRow::summary).collect())
    }

    async fn delete_exam(&self, exam_id: Uuid) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM exams WHERE id = $1"#)
            .bind(exam_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Exam not found".to_string()));
        }
        Ok(())
    }

    async fn list_results(&self) -> Result<Vec<StoredResult>> {
        let rows = sqlx::query_as::<_, StoredResult>(
            r#"
            SELECT id, student_email, exam_id, score, total_questions, created_at
            FROM results
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_messages(&self) -> Result<Vec<StoredMessage>> {
        let rows = sqlx::query_as::<_, StoredMessage>(
            r#"
            SELECT id, student_email, exam_id, content, created_at
            FROM exam_messages
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_proctoring(&self) -> Result<Vec<StoredProctoringRecord>> {
        let rows = sqlx::query_as::<_, StoredProctoringRecord>(
            r#"
            SELECT id, student_email, exam_id, tab_switches, terminated, recorded_at
            FROM proctoring_records
            ORDER BY recorded_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
