use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::models::exam::Question;
use crate::services::exam_service::question_problems;

/// One decoded spreadsheet row, keyed by column header.
pub type TabularRow = Map<String, JsonValue>;

pub const QUESTION_FIELD: &str = "Question";
pub const OPTION_FIELDS: [&str; 4] = ["Option1", "Option2", "Option3", "Option4"];
pub const CORRECT_ANSWER_FIELD: &str = "CorrectAnswer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportError {
    /// 1-based index of the data row.
    pub row: usize,
    pub field: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub questions: Vec<Question>,
    pub errors: Vec<ImportError>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Spreadsheet decoders hand numeric cells over as numbers; they are read
/// back as the text the teacher typed.
fn cell_text(row: &TabularRow, field: &str) -> Option<String> {
    match row.get(field)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Maps rows to questions in row order. Rows with problems are left out and
/// reported instead.
pub fn import_questions(rows: &[TabularRow]) -> ImportReport {
    let mut report = ImportReport::default();

    for (idx, row) in rows.iter().enumerate() {
        let row_number = idx + 1;
        let mut missing = Vec::new();

        let mut required = |field: &str| {
            let value = cell_text(row, field);
            if value.is_none() {
                missing.push(field.to_string());
            }
            value.unwrap_or_default()
        };

        let question = required(QUESTION_FIELD);
        let options: Vec<String> = OPTION_FIELDS.iter().map(|f| required(*f)).collect();
        let correct_answer = required(CORRECT_ANSWER_FIELD);

        if !missing.is_empty() {
            report.errors.extend(missing.into_iter().map(|field| ImportError {
                row: row_number,
                message: format!("{} is missing or blank", field),
                field: Some(field),
            }));
            continue;
        }

        let candidate = Question {
            question,
            options,
            correct_answer,
        };

        let problems = question_problems(&candidate);
        if problems.is_empty() {
            report.questions.push(candidate);
        } else {
            report.errors.extend(problems.into_iter().map(|message| ImportError {
                row: row_number,
                field: None,
                message,
            }));
        }
    }

    if !report.errors.is_empty() {
        tracing::info!(
            "Question import: {} rows accepted, {} problems reported",
            report.questions.len(),
            report.errors.len()
        );
    }
    report
}
