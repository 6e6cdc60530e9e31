pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod utils;

use std::sync::Arc;

use crate::middleware::auth::AuthKeys;
use crate::services::exam_service::ExamCatalog;
use crate::services::identity_service::RevocationList;
use crate::services::session_service::SessionService;
use crate::session::{ExamStore, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ExamStore>,
    pub catalog: Arc<dyn ExamCatalog>,
    pub sessions: SessionService,
    pub auth: AuthKeys,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, jwt_secret: &str) -> Self
    where
        S: ExamStore + ExamCatalog + 'static,
    {
        let revocations = RevocationList::new();
        let sessions = SessionService::new(store.clone(), SessionRegistry::new(), revocations.clone());

        Self {
            store: store.clone(),
            catalog: store,
            sessions,
            auth: AuthKeys::new(jwt_secret, revocations),
        }
    }
}
