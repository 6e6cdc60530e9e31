use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::exam::{ExamDefinition, ExamSummary, NewExam, Question};
use crate::models::message::StoredMessage;
use crate::models::proctoring::StoredProctoringRecord;
use crate::models::result::StoredResult;

/// Teacher-facing store operations.
#[async_trait]
pub trait ExamCatalog: Send + Sync {
    async fn create_exam(&self, exam: NewExam) -> Result<ExamDefinition>;

    async fn list_exams(&self) -> Result<Vec<ExamSummary>>;

    async fn delete_exam(&self, exam_id: Uuid) -> Result<()>;

    async fn list_results(&self) -> Result<Vec<StoredResult>>;

    async fn list_messages(&self) -> Result<Vec<StoredMessage>>;

    async fn list_proctoring(&self) -> Result<Vec<StoredProctoringRecord>>;
}

/// Problems that make a question unusable for value-based grading.
pub fn question_problems(question: &Question) -> Vec<String> {
    let mut problems = Vec::new();

    if question.question.trim().is_empty() {
        problems.push("question text is empty".to_string());
    }
    if question.options.iter().any(|o| o.trim().is_empty()) {
        problems.push("options must not be empty".to_string());
    }

    let mut seen = HashSet::new();
    if let Some(dup) = question.options.iter().find(|o| !seen.insert(o.as_str())) {
        problems.push(format!("option '{}' appears more than once", dup));
    }

    if question.correct_answer.trim().is_empty() {
        problems.push("correct answer is empty".to_string());
    } else if !question.options.contains(&question.correct_answer) {
        problems.push(format!(
            "correct answer '{}' is not one of the options",
            question.correct_answer
        ));
    }

    problems
}

pub fn validate_new_exam(exam: &NewExam) -> Result<()> {
    if exam.name.trim().is_empty() {
        return Err(Error::Validation("Exam name cannot be empty".to_string()));
    }
    if exam.questions.is_empty() {
        return Err(Error::Validation("An exam needs at least one question".to_string()));
    }

    let problems: Vec<String> = exam
        .questions
        .iter()
        .enumerate()
        .flat_map(|(idx, q)| {
            question_problems(q)
                .into_iter()
                .map(move |p| format!("question {}: {}", idx + 1, p))
        })
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(problems.join("; ")))
    }
}

pub fn exam_link(exam_id: Uuid) -> String {
    format!("/exam/{}", exam_id)
}
