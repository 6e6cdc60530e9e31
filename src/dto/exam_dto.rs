use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::exam::Question;
use crate::services::import_service::TabularRow;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionPayload {
    #[validate(custom(function = "crate::utils::validation::not_blank"))]
    pub question: String,
    #[validate(length(min = 1, message = "a question needs options"))]
    pub options: Vec<String>,
    #[validate(custom(function = "crate::utils::validation::not_blank"))]
    pub correct_answer: String,
}

impl From<QuestionPayload> for Question {
    fn from(payload: QuestionPayload) -> Self {
        Question {
            question: payload.question,
            options: payload.options,
            correct_answer: payload.correct_answer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateExamPayload {
    #[validate(custom(function = "crate::utils::validation::not_blank"))]
    pub name: String,
    #[validate(length(min = 1, message = "an exam needs at least one question"), nested)]
    pub questions: Vec<QuestionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExamResponse {
    pub id: Uuid,
    pub name: String,
    pub question_count: usize,
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportQuestionsPayload {
    pub rows: Vec<TabularRow>,
}
