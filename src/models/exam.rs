use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    /// Matched against answers by value, not by option position.
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamDefinition {
    pub id: Uuid,
    pub name: String,
    pub questions: Vec<Question>,
}

impl ExamDefinition {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn student_view(&self) -> StudentExamView {
        StudentExamView {
            id: self.id,
            name: self.name.clone(),
            questions: self
                .questions
                .iter()
                .map(|q| StudentQuestion {
                    question: q.question.clone(),
                    options: q.options.clone(),
                })
                .collect(),
        }
    }
}

/// Exam as presented to a student: correct answers are never sent out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentExamView {
    pub id: Uuid,
    pub name: String,
    pub questions: Vec<StudentQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentQuestion {
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSummary {
    pub id: Uuid,
    pub name: String,
    pub question_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewExam {
    pub name: String,
    pub questions: Vec<Question>,
    pub created_by: String,
}
