use std::sync::Arc;

use chrono::Utc;
use exam_proctor::error::Error;
use exam_proctor::models::exam::{NewExam, Question};
use exam_proctor::models::identity::{Identity, Role};
use exam_proctor::services::environment_service::BrowserEnvironment;
use exam_proctor::services::exam_service::ExamCatalog;
use exam_proctor::services::identity_service::{RevocationList, TokenIdentity};
use exam_proctor::services::memory_store::MemoryExamStore;
use exam_proctor::services::session_service::SessionService;
use exam_proctor::session::{
    Collaborators, IdentityProvider, Phase, ProctoredSession, SessionHandle, SessionRegistry,
    Signal,
};
use uuid::Uuid;

fn student(uid: &str) -> Identity {
    Identity {
        uid: uid.to_string(),
        email: format!("{}@example.com", uid),
        email_verified: true,
        role: Role::Student,
    }
}

async fn seeded_store() -> (Arc<MemoryExamStore>, Uuid) {
    let store = Arc::new(MemoryExamStore::new());
    let exam = store
        .create_exam(NewExam {
            name: "Geography".to_string(),
            questions: vec![
                Question {
                    question: "Capital of France?".to_string(),
                    options: vec!["Paris".into(), "Lyon".into()],
                    correct_answer: "Paris".to_string(),
                },
                Question {
                    question: "Longest river?".to_string(),
                    options: vec!["Nile".into(), "Amazon".into()],
                    correct_answer: "Nile".to_string(),
                },
            ],
            created_by: "teacher@example.com".to_string(),
        })
        .await
        .unwrap();
    (store, exam.id)
}

struct Harness {
    handle: SessionHandle,
    environment: Arc<BrowserEnvironment>,
    identity: Arc<TokenIdentity>,
    revocations: RevocationList,
    store: Arc<MemoryExamStore>,
}

async fn spawn_session() -> Harness {
    let (store, exam_id) = seeded_store().await;
    let environment = Arc::new(BrowserEnvironment::new());
    let revocations = RevocationList::new();
    let identity = Arc::new(TokenIdentity::new(student("s1"), revocations.clone()));

    let collaborators = Collaborators {
        identity: identity.clone(),
        store: store.clone(),
        environment: environment.clone(),
    };
    let session = ProctoredSession::open(exam_id, student("s1"), collaborators)
        .await
        .unwrap();

    Harness {
        handle: SessionHandle::spawn(session),
        environment,
        identity,
        revocations,
        store,
    }
}

#[tokio::test]
async fn environment_events_are_applied_in_arrival_order() {
    let h = spawn_session().await;
    let mut signals = h.handle.subscribe_signals();

    h.handle.start().await.unwrap();
    assert!(h.environment.fullscreen_requested());

    h.environment.report_visibility_hidden();
    h.environment.report_fullscreen_change(false);
    h.environment.report_visibility_hidden();

    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.tab_switches, 2);
    assert!(snapshot.input_blocked);
    assert_eq!(snapshot.phase, Phase::InProgress);

    assert_eq!(signals.recv().await.unwrap(), Signal::Warning { count: 1 });
    assert_eq!(signals.recv().await.unwrap(), Signal::ReturnToFullscreen);
    assert_eq!(signals.recv().await.unwrap(), Signal::Warning { count: 2 });
}

#[tokio::test]
async fn third_strike_through_environment_signs_the_student_out() {
    let h = spawn_session().await;
    let issued_before = Utc::now().timestamp();
    let mut signals = h.handle.subscribe_signals();

    h.handle.start().await.unwrap();
    for _ in 0..3 {
        h.environment.report_visibility_hidden();
    }

    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, Phase::Terminated);
    assert!(!snapshot.signed_in);
    assert!(snapshot.finished_at.is_some());

    signals.recv().await.unwrap();
    signals.recv().await.unwrap();
    assert_eq!(
        signals.recv().await.unwrap(),
        Signal::Terminate {
            count: 3,
            signed_out: true
        }
    );

    assert!(h.identity.current_user().is_none());
    assert!(h.revocations.is_revoked("s1", issued_before));

    let records = h.store.list_proctoring().await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].terminated);
    assert_eq!(records[0].tab_switches, 3);
    assert_eq!(records[0].student_email, "s1@example.com");

    // Events after termination are dropped by the session.
    h.environment.report_visibility_hidden();
    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.tab_switches, 3);

    let err = h.handle.submit().await.unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition { .. }));
}

#[tokio::test]
async fn submit_through_handle_records_result() {
    let h = spawn_session().await;

    h.handle.start().await.unwrap();
    h.handle.record_answer(0, "Paris").await.unwrap();
    h.handle.record_answer(1, "Amazon").await.unwrap();

    let score = h.handle.submit().await.unwrap();
    assert_eq!(score.correct, 1);
    assert_eq!(score.total, 2);

    let results = h.store.list_results().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].student_email, "s1@example.com");
    assert_eq!(results[0].score, 1);

    let err = h.handle.submit().await.unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition { .. }));
    assert_eq!(h.store.list_results().await.unwrap().len(), 1);
}

#[tokio::test]
async fn direct_proctoring_calls_return_their_signal() {
    let h = spawn_session().await;
    h.handle.start().await.unwrap();

    assert_eq!(
        h.handle.visibility_lost().await.unwrap(),
        Signal::Warning { count: 1 }
    );
    assert_eq!(
        h.handle.fullscreen_changed(true).await.unwrap(),
        Signal::FullscreenRestored
    );

    h.handle.send_message("Question 2 is unclear").await.unwrap();
    let messages = h.store.list_messages().await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "Question 2 is unclear");
}

#[tokio::test]
async fn sweep_evicts_only_finished_sessions() {
    let (store, exam_id) = seeded_store().await;
    let registry = SessionRegistry::new();
    let service = SessionService::new(store, registry.clone(), RevocationList::new());

    let finished = service.open_session(student("a"), exam_id).await.unwrap();
    let active = service.open_session(student("b"), exam_id).await.unwrap();

    finished.handle.start().await.unwrap();
    finished.handle.submit().await.unwrap();
    active.handle.start().await.unwrap();
    assert_eq!(registry.len(), 2);

    let evicted = registry
        .sweep(chrono::Duration::zero(), chrono::Duration::hours(4))
        .await;
    assert_eq!(evicted, 1);
    assert!(registry.get(finished.handle.id()).is_none());
    assert!(registry.get(active.handle.id()).is_some());
}

#[tokio::test]
async fn sessions_are_only_visible_to_their_owner() {
    let (store, exam_id) = seeded_store().await;
    let service = SessionService::new(store, SessionRegistry::new(), RevocationList::new());

    let entry = service.open_session(student("owner"), exam_id).await.unwrap();
    let id = entry.handle.id();

    assert!(service.owned_session(id, "owner").is_ok());
    assert!(matches!(
        service.owned_session(id, "intruder"),
        Err(Error::Forbidden(_))
    ));
    assert!(matches!(
        service.owned_session(Uuid::new_v4(), "owner"),
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn sweep_evicts_sessions_past_their_maximum_age() {
    let (store, exam_id) = seeded_store().await;
    let registry = SessionRegistry::new();
    let service = SessionService::new(store, registry.clone(), RevocationList::new());

    for uid in ["a", "b", "c"] {
        service.open_session(student(uid), exam_id).await.unwrap();
    }
    let started = service.open_session(student("d"), exam_id).await.unwrap();
    started.handle.start().await.unwrap();

    let kept = registry
        .sweep(chrono::Duration::zero(), chrono::Duration::hours(4))
        .await;
    assert_eq!(kept, 0);
    assert_eq!(registry.len(), 4);

    let evicted = registry
        .sweep(chrono::Duration::hours(1), chrono::Duration::zero())
        .await;
    assert_eq!(evicted, 4);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn reopening_an_exam_replaces_the_unfinished_session() {
    let (store, exam_id) = seeded_store().await;
    let registry = SessionRegistry::new();
    let service = SessionService::new(store, registry.clone(), RevocationList::new());

    let mut last = None;
    for _ in 0..50 {
        last = Some(service.open_session(student("s1"), exam_id).await.unwrap());
    }
    assert_eq!(registry.len(), 1);
    let last = last.unwrap();
    assert!(registry.get(last.handle.id()).is_some());

    // A finished session is kept next to the new one.
    last.handle.start().await.unwrap();
    last.handle.submit().await.unwrap();
    let next = service.open_session(student("s1"), exam_id).await.unwrap();
    assert_eq!(registry.len(), 2);
    assert!(registry.get(next.handle.id()).is_some());

    service.open_session(student("s2"), exam_id).await.unwrap();
    assert_eq!(registry.len(), 3);
}

#[test]
fn revocation_applies_up_to_the_second_it_happened() {
    let revocations = RevocationList::new();
    let before = Utc::now().timestamp();
    revocations.revoke("s1");
    let after = Utc::now().timestamp();

    assert!(revocations.is_revoked("s1", before));
    assert!(!revocations.is_revoked("s1", after + 1));
    assert!(!revocations.is_revoked("s2", before));
}

#[tokio::test]
async fn submitted_sessions_leave_a_proctoring_record() {
    let h = spawn_session().await;

    h.handle.start().await.unwrap();
    h.handle.visibility_lost().await.unwrap();
    h.handle.submit().await.unwrap();

    let records = h.store.list_proctoring().await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].terminated);
    assert_eq!(records[0].tab_switches, 1);
}
