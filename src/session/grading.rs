use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::exam::{ExamDefinition, Question};

/// Question index -> chosen option value. Unanswered questions have no entry.
pub type AnswerSet = BTreeMap<usize, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct: u32,
    pub total: u32,
}

pub fn is_correct(question: &Question, answer: Option<&str>) -> bool {
    answer == Some(question.correct_answer.as_str())
}

/// Counts exact, case-sensitive matches. Missing answers count as incorrect.
pub fn grade(definition: &ExamDefinition, answers: &AnswerSet) -> Score {
    let correct = definition
        .questions
        .iter()
        .enumerate()
        .filter(|(idx, q)| is_correct(q, answers.get(idx).map(String::as_str)))
        .count();

    Score {
        correct: correct as u32,
        total: definition.question_count() as u32,
    }
}
