use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::identity::Identity;
use crate::services::environment_service::BrowserEnvironment;
use crate::services::identity_service::{RevocationList, TokenIdentity};
use crate::session::collaborators::{Collaborators, ExamStore};
use crate::session::{ProctoredSession, SessionEntry, SessionHandle, SessionRegistry};

/// Opens proctored sessions and looks them up on behalf of their owners.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn ExamStore>,
    registry: SessionRegistry,
    revocations: RevocationList,
}

impl SessionService {
    pub fn new(store: Arc<dyn ExamStore>, registry: SessionRegistry, revocations: RevocationList) -> Self {
        Self {
            store,
            registry,
            revocations,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub async fn open_session(&self, student: Identity, exam_id: Uuid) -> Result<SessionEntry> {
        let environment = Arc::new(BrowserEnvironment::new());
        let identity = Arc::new(TokenIdentity::new(student.clone(), self.revocations.clone()));

        let collaborators = Collaborators {
            identity,
            store: self.store.clone(),
            environment: environment.clone(),
        };

        let owner = student.uid.clone();
        self.abandon_unfinished(&owner, exam_id).await;

        let session = ProctoredSession::open(exam_id, student, collaborators).await?;
        let exam = Arc::new(session.exam().student_view());
        let handle = SessionHandle::spawn(session);

        let entry = SessionEntry {
            handle,
            environment,
            owner,
            exam,
            created_at: Utc::now(),
        };
        self.registry.insert(entry.clone());

        tracing::info!(session_id = %entry.handle.id(), exam_id = %exam_id, "Session opened");
        Ok(entry)
    }

    /// A student holds at most one unfinished session per exam: opening a new
    /// one drops the previous one. Finished sessions stay until swept.
    async fn abandon_unfinished(&self, owner: &str, exam_id: Uuid) {
        for entry in self.registry.find_for(owner, exam_id) {
            let finished = entry
                .handle
                .snapshot()
                .await
                .is_ok_and(|snapshot| snapshot.phase.is_terminal());
            if !finished && self.registry.remove(entry.handle.id()).is_some() {
                tracing::info!(
                    session_id = %entry.handle.id(),
                    exam_id = %exam_id,
                    "Unfinished session replaced by a new one"
                );
            }
        }
    }

    pub fn owned_session(&self, session_id: Uuid, uid: &str) -> Result<SessionEntry> {
        let entry = self
            .registry
            .get(session_id)
            .ok_or_else(|| Error::NotFound("Session not found".to_string()))?;

        if entry.owner != uid {
            return Err(Error::Forbidden("Session belongs to another student".to_string()));
        }
        Ok(entry)
    }
}
