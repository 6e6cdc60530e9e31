use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::SessionHandle;
use crate::models::exam::StudentExamView;
use crate::services::environment_service::BrowserEnvironment;

#[derive(Clone)]
pub struct SessionEntry {
    pub handle: SessionHandle,
    pub environment: Arc<BrowserEnvironment>,
    /// Subject (uid) of the student who opened the session.
    pub owner: String,
    pub exam: Arc<StudentExamView>,
    pub created_at: DateTime<Utc>,
}

/// Active sessions keyed by session id.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: SessionEntry) {
        let mut map = self.inner.lock().expect("session registry poisoned");
        map.insert(entry.handle.id(), entry);
    }

    pub fn get(&self, session_id: Uuid) -> Option<SessionEntry> {
        let map = self.inner.lock().expect("session registry poisoned");
        map.get(&session_id).cloned()
    }

    pub fn remove(&self, session_id: Uuid) -> Option<SessionEntry> {
        let mut map = self.inner.lock().expect("session registry poisoned");
        map.remove(&session_id)
    }

    /// Sessions of one student for one exam.
    pub fn find_for(&self, owner: &str, exam_id: Uuid) -> Vec<SessionEntry> {
        let map = self.inner.lock().expect("session registry poisoned");
        map.values()
            .filter(|entry| entry.owner == owner && entry.exam.id == exam_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("session registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evicts sessions that reached a terminal phase more than `retention`
    /// ago, and any session opened more than `max_age` ago whatever its
    /// phase. Returns the number of evicted sessions.
    pub async fn sweep(&self, retention: Duration, max_age: Duration) -> usize {
        let entries: Vec<SessionEntry> = {
            let map = self.inner.lock().expect("session registry poisoned");
            map.values().cloned().collect()
        };

        let now = Utc::now();
        let finished_cutoff = now - retention;
        let opened_cutoff = now - max_age;
        let mut evicted = 0;
        for entry in entries {
            let expired = entry.created_at <= opened_cutoff
                || match entry.handle.snapshot().await {
                    Ok(snapshot) => {
                        snapshot.phase.is_terminal()
                            && snapshot.finished_at.is_some_and(|at| at <= finished_cutoff)
                    }
                    // The task is gone; nothing can reach this session anymore.
                    Err(_) => true,
                };
            if expired && self.remove(entry.handle.id()).is_some() {
                evicted += 1;
            }
        }

        if evicted > 0 {
            tracing::info!("Evicted {} sessions", evicted);
        }
        evicted
    }
}
