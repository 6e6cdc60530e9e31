use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::exam::{ExamDefinition, ExamSummary, NewExam};
use crate::models::message::{MessageRecord, StoredMessage};
use crate::models::proctoring::{ProctoringRecord, StoredProctoringRecord};
use crate::models::result::{ResultRecord, StoredResult};
use crate::services::exam_service::ExamCatalog;
use crate::session::collaborators::ExamStore;

struct StoredExam {
    definition: ExamDefinition,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryState {
    exams: Vec<StoredExam>,
    results: Vec<StoredResult>,
    messages: Vec<StoredMessage>,
    proctoring: Vec<StoredProctoringRecord>,
}

/// In-process store used when no database is configured.
#[derive(Default)]
pub struct MemoryExamStore {
    state: RwLock<MemoryState>,
}

impl MemoryExamStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExamStore for MemoryExamStore {
    async fn load_exam(&self, exam_id: Uuid) -> Result<ExamDefinition> {
        let state = self.state.read().await;
        state
            .exams
            .iter()
            .find(|e| e.definition.id == exam_id)
            .map(|e| e.definition.clone())
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))
    }

    async fn submit_result(&self, record: ResultRecord) -> Result<()> {
        let mut state = self.state.write().await;
        state.results.push(StoredResult {
            id: Uuid::new_v4(),
            student_email: record.student_email,
            exam_id: record.exam_id,
            score: record.score as i32,
            total_questions: record.total_questions as i32,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn submit_message(&self, record: MessageRecord) -> Result<()> {
        let mut state = self.state.write().await;
        state.messages.push(StoredMessage {
            id: Uuid::new_v4(),
            student_email: record.student_email,
            exam_id: record.exam_id,
            content: record.content,
            created_at: record.created_at,
        });
        Ok(())
    }

    async fn record_proctoring(&self, record: ProctoringRecord) -> Result<()> {
        let mut state = self.state.write().await;
        state.proctoring.push(StoredProctoringRecord {
            id: Uuid::new_v4(),
            student_email: record.student_email,
            exam_id: record.exam_id,
            tab_switches: record.tab_switches as i32,
            terminated: record.terminated,
            recorded_at: record.recorded_at,
        });
        Ok(())
    }
}

#[async_trait]
impl ExamCatalog for MemoryExamStore {
    async fn create_exam(&self, exam: NewExam) -> Result<ExamDefinition> {
        let definition = ExamDefinition {
            id: Uuid::new_v4(),
            name: exam.name,
            questions: exam.questions,
        };
        let mut state = self.state.write().await;
        state.exams.push(StoredExam {
            definition: definition.clone(),
            created_at: Utc::now(),
        });
        Ok(definition)
    }

    async fn list_exams(&self) -> Result<Vec<ExamSummary>> {
        let state = self.state.read().await;
        Ok(state
            .exams
            .iter()
            .map(|e| ExamSummary {
                id: e.definition.id,
                name: e.definition.name.clone(),
                question_count: e.definition.question_count(),
                created_at: e.created_at,
            })
            .collect())
    }

    async fn delete_exam(&self, exam_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        let before = state.exams.len();
        state.exams.retain(|e| e.definition.id != exam_id);
        if state.exams.len() == before {
            return Err(Error::NotFound("Exam not found".to_string()));
        }
        Ok(())
    }

    async fn list_results(&self) -> Result<Vec<StoredResult>> {
        Ok(self.state.read().await.results.clone())
    }

    async fn list_messages(&self) -> Result<Vec<StoredMessage>> {
        Ok(self.state.read().await.messages.clone())
    }

    async fn list_proctoring(&self) -> Result<Vec<StoredProctoringRecord>> {
        Ok(self.state.read().await.proctoring.clone())
    }
}
