use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::Result;
use crate::models::identity::Identity;
use crate::session::collaborators::{AuthCallback, IdentityProvider, Listeners, Subscription};

/// Subjects whose tokens issued up to a given instant are no longer accepted.
#[derive(Clone, Default)]
pub struct RevocationList {
    revoked: Arc<Mutex<HashMap<String, i64>>>,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&self, subject: &str) {
        let now = Utc::now().timestamp();
        let mut map = self.revoked.lock().expect("revocation list poisoned");
        map.insert(subject.to_string(), now);
    }

    /// A token is revoked when it was issued no later than the revocation.
    /// `iat` has second precision, so a token minted in the same second as
    /// the revocation is revoked as well; one from a later second is not.
    pub fn is_revoked(&self, subject: &str, issued_at: i64) -> bool {
        let map = self.revoked.lock().expect("revocation list poisoned");
        map.get(subject).is_some_and(|revoked_at| issued_at <= *revoked_at)
    }
}

/// Identity of the student behind one session, taken from a verified token.
pub struct TokenIdentity {
    identity: Identity,
    revocations: RevocationList,
    signed_out: AtomicBool,
    listeners: Listeners<Option<Identity>>,
}

impl TokenIdentity {
    pub fn new(identity: Identity, revocations: RevocationList) -> Self {
        Self {
            identity,
            revocations,
            signed_out: AtomicBool::new(false),
            listeners: Listeners::default(),
        }
    }
}

#[async_trait]
impl IdentityProvider for TokenIdentity {
    fn current_user(&self) -> Option<Identity> {
        if self.signed_out.load(Ordering::SeqCst) {
            None
        } else {
            Some(self.identity.clone())
        }
    }

    fn on_auth_change(&self, callback: AuthCallback) -> Subscription {
        self.listeners.add(move |user| callback(user))
    }

    async fn sign_out(&self) -> Result<()> {
        self.revocations.revoke(&self.identity.uid);
        self.signed_out.store(true, Ordering::SeqCst);
        tracing::info!(student = %self.identity.email, "Signed out, outstanding tokens revoked");
        self.listeners.emit(None);
        Ok(())
    }
}
