use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use exam_proctor::error::{Error, Result};
use exam_proctor::models::exam::{ExamDefinition, Question};
use exam_proctor::models::identity::{Identity, Role};
use exam_proctor::models::message::MessageRecord;
use exam_proctor::models::proctoring::ProctoringRecord;
use exam_proctor::models::result::ResultRecord;
use exam_proctor::session::collaborators::{
    AuthCallback, FullscreenCallback, Listeners, VisibilityCallback,
};
use exam_proctor::session::{
    Collaborators, Environment, ExamStore, IdentityProvider, Phase, ProctoredSession, Signal,
    SubmissionStatus, Subscription,
};
use mockall::mock;
use mockall::predicate::eq;
use uuid::Uuid;

mock! {
    pub Store {}

    #[async_trait]
    impl ExamStore for Store {
        async fn load_exam(&self, exam_id: Uuid) -> Result<ExamDefinition>;
        async fn submit_result(&self, record: ResultRecord) -> Result<()>;
        async fn submit_message(&self, record: MessageRecord) -> Result<()>;
        async fn record_proctoring(&self, record: ProctoringRecord) -> Result<()>;
    }
}

mock! {
    pub Auth {}

    #[async_trait]
    impl IdentityProvider for Auth {
        fn current_user(&self) -> Option<Identity>;
        fn on_auth_change(&self, callback: AuthCallback) -> Subscription;
        async fn sign_out(&self) -> Result<()>;
    }
}

mock! {
    pub Env {}

    impl Environment for Env {
        fn request_fullscreen(&self) -> bool;
        fn on_visibility_hidden(&self, callback: VisibilityCallback) -> Subscription;
        fn on_fullscreen_change(&self, callback: FullscreenCallback) -> Subscription;
    }
}

fn sample_exam() -> ExamDefinition {
    let question = |text: &str, correct: &str| Question {
        question: text.to_string(),
        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        correct_answer: correct.to_string(),
    };

    ExamDefinition {
        id: Uuid::new_v4(),
        name: "Algebra".to_string(),
        questions: vec![question("q1", "A"), question("q2", "B"), question("q3", "C")],
    }
}

fn student() -> Identity {
    Identity {
        uid: "student-1".to_string(),
        email: "student@example.com".to_string(),
        email_verified: true,
        role: Role::Student,
    }
}

fn accepting_proctoring() -> MockStore {
    let mut store = MockStore::new();
    store.expect_record_proctoring().returning(|_| Ok(()));
    store
}

fn fullscreen_env(granted: bool) -> MockEnv {
    let mut env = MockEnv::new();
    env.expect_request_fullscreen().return_const(granted);
    env
}

fn session_with(store: MockStore, auth: MockAuth, env: MockEnv) -> ProctoredSession {
    let collaborators = Collaborators {
        identity: Arc::new(auth),
        store: Arc::new(store),
        environment: Arc::new(env),
    };
    ProctoredSession::new(sample_exam(), student(), collaborators)
}

fn started(store: MockStore, auth: MockAuth) -> ProctoredSession {
    let mut session = session_with(store, auth, fullscreen_env(true));
    session.start().expect("start");
    session
}

#[tokio::test]
async fn third_tab_switch_terminates_and_signs_out_once() {
    let mut auth = MockAuth::new();
    auth.expect_sign_out().times(1).returning(|| Ok(()));
    let mut store = MockStore::new();
    store
        .expect_record_proctoring()
        .withf(|record| record.terminated && record.tab_switches == 3)
        .times(1)
        .returning(|_| Ok(()));
    let mut session = started(store, auth);

    assert_eq!(
        session.notify_visibility_lost().await.unwrap(),
        Signal::Warning { count: 1 }
    );
    assert_eq!(
        session.notify_visibility_lost().await.unwrap(),
        Signal::Warning { count: 2 }
    );
    assert_eq!(session.phase(), Phase::InProgress);

    let third = session.notify_visibility_lost().await.unwrap();
    assert_eq!(
        third,
        Signal::Terminate {
            count: 3,
            signed_out: true
        }
    );
    assert_eq!(session.phase(), Phase::Terminated);
    assert!(!session.snapshot().signed_in);

    let err = session.notify_visibility_lost().await.unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition { .. }));
    assert_eq!(session.state().tab_switches, 3);
}

#[tokio::test]
async fn termination_stands_when_sign_out_fails() {
    let mut auth = MockAuth::new();
    auth.expect_sign_out()
        .times(1)
        .returning(|| Err(Error::Internal("provider unreachable".to_string())));
    let mut session = started(accepting_proctoring(), auth);

    for _ in 0..2 {
        session.notify_visibility_lost().await.unwrap();
    }
    let signal = session.notify_visibility_lost().await.unwrap();

    assert_eq!(
        signal,
        Signal::Terminate {
            count: 3,
            signed_out: false
        }
    );
    assert_eq!(session.phase(), Phase::Terminated);
    assert!(session.snapshot().signed_in);
}

#[tokio::test]
async fn terminated_session_cannot_submit() {
    let mut auth = MockAuth::new();
    auth.expect_sign_out().returning(|| Ok(()));
    let mut store = accepting_proctoring();
    store.expect_submit_result().times(0);
    let mut session = started(store, auth);

    for _ in 0..3 {
        session.notify_visibility_lost().await.unwrap();
    }

    let err = session.submit().await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidStateTransition {
            phase: Phase::Terminated,
            ..
        }
    ));
}

#[tokio::test]
async fn submit_grades_by_value_and_writes_once() {
    let mut store = accepting_proctoring();
    store
        .expect_submit_result()
        .withf(|record| {
            record.score == 2
                && record.total_questions == 3
                && record.student_email == "student@example.com"
        })
        .times(1)
        .returning(|_| Ok(()));
    let mut session = started(store, MockAuth::new());

    session.record_answer(0, "A").unwrap();
    session.record_answer(1, "C").unwrap();
    session.record_answer(2, "C").unwrap();
    // Last write wins.
    session.record_answer(1, "B").unwrap();
    session.record_answer(0, "a").unwrap();
    session.record_answer(0, "A").unwrap();

    let score = session.submit().await.unwrap();
    assert_eq!(score.correct, 3);
    assert_eq!(score.total, 3);
    assert_eq!(session.phase(), Phase::Submitted);
}

#[tokio::test]
async fn unanswered_questions_count_as_incorrect() {
    let mut store = accepting_proctoring();
    store
        .expect_submit_result()
        .withf(|record| record.score == 2 && record.total_questions == 3)
        .times(1)
        .returning(|_| Ok(()));
    let mut session = started(store, MockAuth::new());

    session.record_answer(0, "A").unwrap();
    session.record_answer(1, "B").unwrap();

    let score = session.submit().await.unwrap();
    assert_eq!(score.correct, 2);
    assert_eq!(session.snapshot().score, Some(2));
}

#[tokio::test]
async fn second_submit_is_rejected_without_a_second_write() {
    let mut store = MockStore::new();
    store
        .expect_record_proctoring()
        .withf(|record| !record.terminated && record.tab_switches == 0)
        .times(1)
        .returning(|_| Ok(()));
    store.expect_submit_result().times(1).returning(|_| Ok(()));
    let mut session = started(store, MockAuth::new());

    session.submit().await.unwrap();
    let err = session.submit().await.unwrap_err();

    assert!(matches!(
        err,
        Error::InvalidStateTransition {
            phase: Phase::Submitted,
            ..
        }
    ));
}

#[tokio::test]
async fn failed_write_keeps_session_in_progress_and_allows_retry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut store = accepting_proctoring();
    store.expect_submit_result().times(2).returning(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(Error::Internal("connection reset".to_string()))
        } else {
            Ok(())
        }
    });
    let mut session = started(store, MockAuth::new());
    session.record_answer(0, "A").unwrap();

    let err = session.submit().await.unwrap_err();
    assert!(matches!(err, Error::Collaborator(_)));
    assert_eq!(session.phase(), Phase::InProgress);
    assert!(matches!(
        session.snapshot().submission,
        SubmissionStatus::Failed { .. }
    ));

    // Answers survive the failed attempt.
    let score = session.submit().await.unwrap();
    assert_eq!(score.correct, 1);
    assert_eq!(session.phase(), Phase::Submitted);
    assert_eq!(session.snapshot().submission, SubmissionStatus::Acknowledged);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn record_answer_rejects_out_of_range_indices() {
    let mut session = started(MockStore::new(), MockAuth::new());

    assert!(matches!(
        session.record_answer(3, "A").unwrap_err(),
        Error::Validation(_)
    ));
    assert!(matches!(
        session.record_answer(-1, "A").unwrap_err(),
        Error::Validation(_)
    ));
    assert!(session.state().answers.is_empty());
}

#[tokio::test]
async fn actions_before_start_are_invalid() {
    let mut session = session_with(MockStore::new(), MockAuth::new(), MockEnv::new());

    assert!(matches!(
        session.record_answer(0, "A").unwrap_err(),
        Error::InvalidStateTransition {
            phase: Phase::NotStarted,
            ..
        }
    ));
    assert!(session.notify_visibility_lost().await.is_err());
    assert!(session.notify_fullscreen_change(false).is_err());
    assert!(session.submit().await.is_err());
}

#[tokio::test]
async fn start_requests_fullscreen_and_runs_once() {
    let mut env = MockEnv::new();
    env.expect_request_fullscreen().times(1).return_const(false);
    let mut session = session_with(MockStore::new(), MockAuth::new(), env);

    session.start().unwrap();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase, Phase::InProgress);
    assert!(!snapshot.fullscreen_granted);
    assert_eq!(snapshot.tab_switches, 0);
    assert!(snapshot.started_at.is_some());

    let err = session.start().unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidStateTransition {
            phase: Phase::InProgress,
            ..
        }
    ));
}

#[tokio::test]
async fn leaving_fullscreen_blocks_input_until_restored() {
    let mut session = started(MockStore::new(), MockAuth::new());

    assert_eq!(
        session.notify_fullscreen_change(false).unwrap(),
        Signal::ReturnToFullscreen
    );
    assert!(session.snapshot().input_blocked);
    assert!(!session.state().fullscreen_compliant);

    assert_eq!(
        session.notify_fullscreen_change(true).unwrap(),
        Signal::FullscreenRestored
    );
    assert!(!session.snapshot().input_blocked);
    assert_eq!(session.state().tab_switches, 0);
}

#[tokio::test]
async fn blank_messages_never_reach_the_store() {
    let mut store = MockStore::new();
    store.expect_submit_message().times(0);
    let mut session = started(store, MockAuth::new());

    assert!(matches!(
        session.send_message("").await.unwrap_err(),
        Error::Validation(_)
    ));
    assert!(matches!(
        session.send_message("   \n").await.unwrap_err(),
        Error::Validation(_)
    ));
}

#[tokio::test]
async fn messages_can_be_sent_in_any_phase() {
    let mut store = accepting_proctoring();
    store
        .expect_submit_message()
        .withf(|record| record.content == "I need help")
        .times(2)
        .returning(|_| Ok(()));
    store.expect_submit_result().returning(|_| Ok(()));
    let mut session = session_with(store, MockAuth::new(), fullscreen_env(true));

    let record = session.send_message("I need help").await.unwrap();
    assert_eq!(record.student_email, "student@example.com");

    session.start().unwrap();
    session.submit().await.unwrap();
    session.send_message("I need help").await.unwrap();
}

#[tokio::test]
async fn message_store_failure_is_a_collaborator_error() {
    let mut store = MockStore::new();
    store
        .expect_submit_message()
        .returning(|_| Err(Error::Internal("down".to_string())));
    let mut session = started(store, MockAuth::new());

    let err = session.send_message("hello").await.unwrap_err();
    assert!(matches!(err, Error::Collaborator(_)));
    assert_eq!(session.phase(), Phase::InProgress);
}

#[tokio::test]
async fn open_loads_the_exam_through_the_store() {
    let exam = sample_exam();
    let exam_id = exam.id;

    let mut store = MockStore::new();
    store
        .expect_load_exam()
        .with(eq(exam_id))
        .times(1)
        .returning(move |_| Ok(exam.clone()));

    let collaborators = Collaborators {
        identity: Arc::new(MockAuth::new()),
        store: Arc::new(store),
        environment: Arc::new(MockEnv::new()),
    };
    let session = ProctoredSession::open(exam_id, student(), collaborators)
        .await
        .unwrap();

    assert_eq!(session.phase(), Phase::NotStarted);
    assert_eq!(session.exam().question_count(), 3);
}

#[tokio::test]
async fn open_fails_for_unknown_exam() {
    let mut store = MockStore::new();
    store
        .expect_load_exam()
        .returning(|_| Err(Error::NotFound("Exam not found".to_string())));

    let collaborators = Collaborators {
        identity: Arc::new(MockAuth::new()),
        store: Arc::new(store),
        environment: Arc::new(MockEnv::new()),
    };
    let result = ProctoredSession::open(Uuid::new_v4(), student(), collaborators).await;

    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn auth_change_updates_signed_in_flag() {
    let mut session = started(MockStore::new(), MockAuth::new());

    session.identity_changed(None);
    assert!(!session.snapshot().signed_in);

    session.identity_changed(Some(&student()));
    assert!(session.snapshot().signed_in);
}

#[tokio::test]
async fn finished_sessions_reject_answers_and_fullscreen_reports() {
    let mut store = accepting_proctoring();
    store.expect_submit_result().returning(|_| Ok(()));
    let mut submitted = started(store, MockAuth::new());
    submitted.submit().await.unwrap();

    assert!(matches!(
        submitted.record_answer(0, "A").unwrap_err(),
        Error::InvalidStateTransition {
            phase: Phase::Submitted,
            ..
        }
    ));
    assert!(matches!(
        submitted.notify_fullscreen_change(false).unwrap_err(),
        Error::InvalidStateTransition {
            phase: Phase::Submitted,
            ..
        }
    ));

    let mut auth = MockAuth::new();
    auth.expect_sign_out().returning(|| Ok(()));
    let mut terminated = started(accepting_proctoring(), auth);
    for _ in 0..3 {
        terminated.notify_visibility_lost().await.unwrap();
    }

    assert!(matches!(
        terminated.record_answer(0, "A").unwrap_err(),
        Error::InvalidStateTransition {
            phase: Phase::Terminated,
            ..
        }
    ));
    assert!(matches!(
        terminated.notify_fullscreen_change(true).unwrap_err(),
        Error::InvalidStateTransition {
            phase: Phase::Terminated,
            ..
        }
    ));
    assert!(terminated.state().fullscreen_compliant);
}

#[tokio::test]
async fn proctoring_write_failure_does_not_undo_termination() {
    let mut auth = MockAuth::new();
    auth.expect_sign_out().times(1).returning(|| Ok(()));
    let mut store = MockStore::new();
    store
        .expect_record_proctoring()
        .times(1)
        .returning(|_| Err(Error::Internal("disk full".to_string())));
    let mut session = started(store, auth);

    for _ in 0..2 {
        session.notify_visibility_lost().await.unwrap();
    }
    let signal = session.notify_visibility_lost().await.unwrap();

    assert!(matches!(signal, Signal::Terminate { count: 3, .. }));
    assert_eq!(session.phase(), Phase::Terminated);
}

#[test]
fn dropped_subscription_stops_delivery() {
    let listeners: Listeners<u32> = Listeners::default();
    let seen = Arc::new(AtomicUsize::new(0));

    let counter = seen.clone();
    let subscription = listeners.add(move |value| {
        counter.fetch_add(value as usize, Ordering::SeqCst);
    });
    listeners.emit(1);
    drop(subscription);
    listeners.emit(10);

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(listeners.is_empty());
}

#[test]
fn unsubscribe_detaches_only_its_own_callback() {
    let listeners: Listeners<u32> = Listeners::default();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let counter = first.clone();
    let first_sub = listeners.add(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = second.clone();
    let _second_sub = listeners.add(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    listeners.emit(0);
    first_sub.unsubscribe();
    listeners.emit(0);

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 2);
    assert_eq!(listeners.len(), 1);
}
