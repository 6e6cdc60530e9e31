//! Contracts the proctored session consumes from the outside world.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::exam::ExamDefinition;
use crate::models::identity::Identity;
use crate::models::message::MessageRecord;
use crate::models::proctoring::ProctoringRecord;
use crate::models::result::ResultRecord;

pub type AuthCallback = Box<dyn Fn(Option<Identity>) + Send + Sync>;
pub type VisibilityCallback = Box<dyn Fn() + Send + Sync>;
pub type FullscreenCallback = Box<dyn Fn(bool) + Send + Sync>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<Identity>;

    fn on_auth_change(&self, callback: AuthCallback) -> Subscription;

    async fn sign_out(&self) -> Result<()>;
}

#[async_trait]
pub trait ExamStore: Send + Sync {
    /// Fails with `Error::NotFound` when no exam has this id.
    async fn load_exam(&self, exam_id: Uuid) -> Result<ExamDefinition>;

    async fn submit_result(&self, record: ResultRecord) -> Result<()>;

    async fn submit_message(&self, record: MessageRecord) -> Result<()>;

    async fn record_proctoring(&self, record: ProctoringRecord) -> Result<()>;
}

pub trait Environment: Send + Sync {
    /// Best effort: the environment may refuse exclusive presentation.
    fn request_fullscreen(&self) -> bool;

    fn on_visibility_hidden(&self, callback: VisibilityCallback) -> Subscription;

    fn on_fullscreen_change(&self, callback: FullscreenCallback) -> Subscription;
}

/// The three collaborators a session is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn ExamStore>,
    pub environment: Arc<dyn Environment>,
}

/// Detaches a registered callback when dropped or explicitly unsubscribed.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

struct ListenerSet<T> {
    next_id: u64,
    callbacks: Vec<(u64, Callback<T>)>,
}

/// Callback list shared by the server-side collaborator implementations.
pub struct Listeners<T> {
    inner: Arc<Mutex<ListenerSet<T>>>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ListenerSet {
                next_id: 0,
                callbacks: Vec::new(),
            })),
        }
    }
}

impl<T: Clone + 'static> Listeners<T> {
    pub fn add(&self, callback: impl Fn(T) + Send + Sync + 'static) -> Subscription {
        let mut set = self.inner.lock().expect("listener set poisoned");
        let id = set.next_id;
        set.next_id += 1;
        set.callbacks.push((id, Arc::new(callback)));

        let weak: Weak<Mutex<ListenerSet<T>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut set = inner.lock().expect("listener set poisoned");
                set.callbacks.retain(|(existing, _)| *existing != id);
            }
        })
    }

    /// Invokes every callback in registration order. The lock is released
    /// first so a callback may register or drop subscriptions.
    pub fn emit(&self, value: T) {
        let callbacks: Vec<Callback<T>> = {
            let set = self.inner.lock().expect("listener set poisoned");
            set.callbacks.iter().map(|(_, cb)| cb.clone()).collect()
        };
        for callback in callbacks {
            callback(value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("listener set poisoned")
            .callbacks
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
