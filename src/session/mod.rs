pub mod collaborators;
pub mod grading;
pub mod policy;
pub mod registry;
pub mod runtime;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::exam::ExamDefinition;
use crate::models::identity::Identity;
use crate::models::message::MessageRecord;
use crate::models::proctoring::ProctoringRecord;
use crate::models::result::ResultRecord;

pub use collaborators::{Collaborators, Environment, ExamStore, IdentityProvider, Subscription};
pub use grading::{grade, AnswerSet, Score};
pub use policy::{Signal, MAX_TAB_SWITCH_WARNINGS};
pub use registry::{SessionEntry, SessionRegistry};
pub use runtime::SessionHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    InProgress,
    Submitted,
    Terminated,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Submitted | Phase::Terminated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::NotStarted => "not_started",
            Phase::InProgress => "in_progress",
            Phase::Submitted => "submitted",
            Phase::Terminated => "terminated",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionStatus {
    NotSubmitted,
    Acknowledged,
    /// The store rejected the result; the session stays in progress.
    Failed { reason: String },
}

/// Mutable state of one student's attempt.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: Phase,
    pub tab_switches: u32,
    pub fullscreen_compliant: bool,
    pub answers: AnswerSet,
    pub score: Option<Score>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::NotStarted,
            tab_switches: 0,
            fullscreen_compliant: true,
            answers: AnswerSet::new(),
            score: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub exam_id: Uuid,
    pub exam_name: String,
    pub student_email: String,
    pub phase: Phase,
    pub tab_switches: u32,
    pub fullscreen_compliant: bool,
    pub fullscreen_granted: bool,
    pub input_blocked: bool,
    pub questions_answered: usize,
    pub total_questions: usize,
    pub score: Option<u32>,
    pub submission: SubmissionStatus,
    pub last_signal: Option<Signal>,
    pub signed_in: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

pub struct ProctoredSession {
    id: Uuid,
    exam: Arc<ExamDefinition>,
    student: Identity,
    collaborators: Collaborators,
    state: SessionState,
    fullscreen_granted: bool,
    submission: SubmissionStatus,
    last_signal: Option<Signal>,
    signed_in: bool,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl ProctoredSession {
    pub fn new(exam: ExamDefinition, student: Identity, collaborators: Collaborators) -> Self {
        Self {
            id: Uuid::new_v4(),
            exam: Arc::new(exam),
            student,
            collaborators,
            state: SessionState::default(),
            fullscreen_granted: false,
            submission: SubmissionStatus::NotSubmitted,
            last_signal: None,
            signed_in: true,
            started_at: None,
            finished_at: None,
        }
    }

    /// Loads the exam through the store and creates a session in `NotStarted`.
    pub async fn open(
        exam_id: Uuid,
        student: Identity,
        collaborators: Collaborators,
    ) -> Result<Self> {
        let exam = collaborators.store.load_exam(exam_id).await?;
        Ok(Self::new(exam, student, collaborators))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn exam(&self) -> &ExamDefinition {
        &self.exam
    }

    pub fn student(&self) -> &Identity {
        &self.student
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    fn ensure_in_progress(&self, operation: &'static str) -> Result<()> {
        if self.state.phase == Phase::InProgress {
            Ok(())
        } else {
            Err(Error::invalid_state(operation, self.state.phase))
        }
    }

    pub fn start(&mut self) -> Result<()> {
        if self.state.phase != Phase::NotStarted {
            return Err(Error::invalid_state("start the exam", self.state.phase));
        }

        let granted = self.collaborators.environment.request_fullscreen();
        if !granted {
            tracing::warn!(session_id = %self.id, "Fullscreen request was not granted");
        }

        self.fullscreen_granted = granted;
        self.state = SessionState {
            phase: Phase::InProgress,
            ..SessionState::default()
        };
        self.started_at = Some(Utc::now());

        tracing::info!(
            session_id = %self.id,
            exam_id = %self.exam.id,
            student = %self.student.email,
            "Exam session started"
        );
        Ok(())
    }

    pub fn record_answer(&mut self, question_index: i64, value: impl Into<String>) -> Result<()> {
        self.ensure_in_progress("record an answer")?;

        let count = self.exam.question_count();
        let index = usize::try_from(question_index)
            .ok()
            .filter(|idx| *idx < count)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Question index {} is out of range (exam has {} questions)",
                    question_index, count
                ))
            })?;

        self.state.answers.insert(index, value.into());
        Ok(())
    }

    /// Counts a tab switch. The third one terminates the session and forces
    /// the student out of the identity provider.
    pub async fn notify_visibility_lost(&mut self) -> Result<Signal> {
        self.ensure_in_progress("report a tab switch")?;

        self.state.tab_switches += 1;
        let count = self.state.tab_switches;

        let signal = if policy::exceeds_strike_limit(count) {
            self.state.phase = Phase::Terminated;
            self.finished_at = Some(Utc::now());

            tracing::warn!(
                session_id = %self.id,
                student = %self.student.email,
                "Anti-cheat: session terminated after {} tab switches",
                count
            );

            let signed_out = match self.collaborators.identity.sign_out().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(session_id = %self.id, "Forced sign-out failed: {}", e);
                    false
                }
            };
            if signed_out {
                self.signed_in = false;
            }
            self.record_proctoring(true).await;
            Signal::Terminate { count, signed_out }
        } else {
            tracing::info!(
                session_id = %self.id,
                "Anti-cheat: tab switch #{} recorded",
                count
            );
            Signal::Warning { count }
        };

        self.last_signal = Some(signal.clone());
        Ok(signal)
    }

    pub fn notify_fullscreen_change(&mut self, is_fullscreen: bool) -> Result<Signal> {
        self.ensure_in_progress("report a fullscreen change")?;

        self.state.fullscreen_compliant = is_fullscreen;
        if !is_fullscreen {
            tracing::info!(session_id = %self.id, "Student left fullscreen, input blocked");
        }

        let signal = policy::fullscreen_signal(is_fullscreen);
        self.last_signal = Some(signal.clone());
        Ok(signal)
    }

    /// Grades the answers and writes the result. The session only becomes
    /// `Submitted` once the store acknowledges the write.
    pub async fn submit(&mut self) -> Result<Score> {
        self.ensure_in_progress("submit")?;

        let score = grade(&self.exam, &self.state.answers);
        let record = ResultRecord {
            student_email: self.student.email.clone(),
            exam_id: self.exam.id,
            score: score.correct,
            total_questions: score.total,
        };

        match self.collaborators.store.submit_result(record).await {
            Ok(()) => {
                self.state.phase = Phase::Submitted;
                self.state.score = Some(score);
                self.submission = SubmissionStatus::Acknowledged;
                self.finished_at = Some(Utc::now());

                tracing::info!(
                    session_id = %self.id,
                    "Exam submitted: score={}/{}",
                    score.correct,
                    score.total
                );
                self.record_proctoring(false).await;
                Ok(score)
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!(session_id = %self.id, "Result write failed: {}", reason);
                self.submission = SubmissionStatus::Failed {
                    reason: reason.clone(),
                };
                Err(Error::Collaborator(format!("Failed to record result: {}", reason)))
            }
        }
    }

    /// Best effort: the phase change has already happened, so a failed write
    /// is logged and not reported to the caller.
    async fn record_proctoring(&self, terminated: bool) {
        let record = ProctoringRecord {
            student_email: self.student.email.clone(),
            exam_id: self.exam.id,
            tab_switches: self.state.tab_switches,
            terminated,
            recorded_at: self.finished_at.unwrap_or_else(Utc::now),
        };

        if let Err(e) = self.collaborators.store.record_proctoring(record).await {
            tracing::error!(session_id = %self.id, "Proctoring record write failed: {}", e);
        }
    }

    pub async fn send_message(&mut self, text: &str) -> Result<MessageRecord> {
        if text.trim().is_empty() {
            return Err(Error::Validation("Message cannot be empty".to_string()));
        }

        let record = MessageRecord {
            student_email: self.student.email.clone(),
            exam_id: self.exam.id,
            content: text.to_string(),
            created_at: Utc::now(),
        };

        self.collaborators
            .store
            .submit_message(record.clone())
            .await
            .map_err(|e| Error::Collaborator(format!("Failed to send message: {}", e)))?;

        tracing::info!(session_id = %self.id, "Message sent to the teacher");
        Ok(record)
    }

    pub fn identity_changed(&mut self, identity: Option<&Identity>) {
        self.signed_in = identity.is_some_and(|user| user.uid == self.student.uid);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            exam_id: self.exam.id,
            exam_name: self.exam.name.clone(),
            student_email: self.student.email.clone(),
            phase: self.state.phase,
            tab_switches: self.state.tab_switches,
            fullscreen_compliant: self.state.fullscreen_compliant,
            fullscreen_granted: self.fullscreen_granted,
            input_blocked: self.state.phase == Phase::InProgress
                && !self.state.fullscreen_compliant,
            questions_answered: self.state.answers.len(),
            total_questions: self.exam.question_count(),
            score: self.state.score.map(|s| s.correct),
            submission: self.submission.clone(),
            last_signal: self.last_signal.clone(),
            signed_in: self.signed_in,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}
