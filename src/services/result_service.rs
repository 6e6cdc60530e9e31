use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::exam::ExamSummary;
use crate::models::proctoring::StoredProctoringRecord;
use crate::models::result::StoredResult;
use crate::session::MAX_TAB_SWITCH_WARNINGS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentScore {
    pub student_email: String,
    pub score: i32,
    pub total_questions: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suspension {
    pub student_email: String,
    pub tab_switches: i32,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamResults {
    pub exam_id: Uuid,
    pub exam_name: String,
    pub results: Vec<StudentScore>,
    /// Tab-switch warnings issued across all finished sessions.
    pub warnings: i32,
    pub suspensions: Vec<Suspension>,
}

impl ExamResults {
    fn new(exam: &ExamSummary) -> Self {
        Self {
            exam_id: exam.id,
            exam_name: exam.name.clone(),
            results: Vec::new(),
            warnings: 0,
            suspensions: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.results.is_empty() && self.warnings == 0 && self.suspensions.is_empty()
    }
}

/// Groups results and proctoring outcomes under their exam, in exam listing
/// order. Records of exams that no longer exist are left out, as are exams
/// with nothing recorded.
pub fn group_results_by_exam(
    exams: &[ExamSummary],
    results: &[StoredResult],
    proctoring: &[StoredProctoringRecord],
) -> Vec<ExamResults> {
    let mut by_exam: HashMap<Uuid, ExamResults> =
        exams.iter().map(|e| (e.id, ExamResults::new(e))).collect();

    for result in results {
        if let Some(group) = by_exam.get_mut(&result.exam_id) {
            group.results.push(StudentScore {
                student_email: result.student_email.clone(),
                score: result.score,
                total_questions: result.total_questions,
            });
        }
    }

    for record in proctoring {
        let Some(group) = by_exam.get_mut(&record.exam_id) else {
            continue;
        };
        group.warnings += record.tab_switches.min(MAX_TAB_SWITCH_WARNINGS as i32);
        if record.terminated {
            group.suspensions.push(Suspension {
                student_email: record.student_email.clone(),
                tab_switches: record.tab_switches,
                recorded_at: record.recorded_at,
            });
        }
    }

    exams
        .iter()
        .filter_map(|exam| by_exam.remove(&exam.id))
        .filter(|group| !group.is_empty())
        .collect()
}

pub fn exam_names(exams: &[ExamSummary]) -> HashMap<Uuid, String> {
    exams.iter().map(|e| (e.id, e.name.clone())).collect()
}
