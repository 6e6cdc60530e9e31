//! Runs a `ProctoredSession` on its own task so that student commands and
//! environment events are applied one at a time, in arrival order.

use tokio::sync::{broadcast, mpsc, oneshot};
use uuid::Uuid;

use super::collaborators::Subscription;
use super::{ProctoredSession, Score, SessionSnapshot, Signal};
use crate::error::{Error, Result};
use crate::models::identity::Identity;
use crate::models::message::MessageRecord;

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    Start(Reply<()>),
    RecordAnswer {
        index: i64,
        value: String,
        reply: Reply<()>,
    },
    VisibilityLost(Option<Reply<Signal>>),
    FullscreenChanged {
        is_fullscreen: bool,
        reply: Option<Reply<Signal>>,
    },
    Submit(Reply<Score>),
    SendMessage {
        text: String,
        reply: Reply<MessageRecord>,
    },
    IdentityChanged(Option<Identity>),
    Snapshot(Reply<SessionSnapshot>),
}

#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<Command>,
    signals: broadcast::Sender<Signal>,
}

impl SessionHandle {
    /// Spawns the session task and wires the identity and environment
    /// subscriptions into it. The task stops once every handle is dropped.
    pub fn spawn(session: ProctoredSession) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (signals, _) = broadcast::channel(32);
        let id = session.id();

        let collaborators = session.collaborators().clone();

        let weak = tx.downgrade();
        let auth = collaborators.identity.on_auth_change(Box::new(move |user| {
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(Command::IdentityChanged(user));
            }
        }));

        let weak = tx.downgrade();
        let visibility = collaborators
            .environment
            .on_visibility_hidden(Box::new(move || {
                if let Some(tx) = weak.upgrade() {
                    let _ = tx.send(Command::VisibilityLost(None));
                }
            }));

        let weak = tx.downgrade();
        let fullscreen = collaborators
            .environment
            .on_fullscreen_change(Box::new(move |is_fullscreen| {
                if let Some(tx) = weak.upgrade() {
                    let _ = tx.send(Command::FullscreenChanged {
                        is_fullscreen,
                        reply: None,
                    });
                }
            }));

        tokio::spawn(run(
            session,
            rx,
            signals.clone(),
            vec![auth, visibility, fullscreen],
        ));

        Self { id, tx, signals }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Signals produced by proctoring events, including those that arrived
    /// through environment subscriptions.
    pub fn subscribe_signals(&self) -> broadcast::Receiver<Signal> {
        self.signals.subscribe()
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| Error::Internal("Session task has stopped".to_string()))?;
        rx.await
            .map_err(|_| Error::Internal("Session task dropped the request".to_string()))?
    }

    pub async fn start(&self) -> Result<()> {
        self.request(Command::Start).await
    }

    pub async fn record_answer(&self, index: i64, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.request(|reply| Command::RecordAnswer {
            index,
            value,
            reply,
        })
        .await
    }

    pub async fn visibility_lost(&self) -> Result<Signal> {
        self.request(|reply| Command::VisibilityLost(Some(reply)))
            .await
    }

    pub async fn fullscreen_changed(&self, is_fullscreen: bool) -> Result<Signal> {
        self.request(|reply| Command::FullscreenChanged {
            is_fullscreen,
            reply: Some(reply),
        })
        .await
    }

    pub async fn submit(&self) -> Result<Score> {
        self.request(Command::Submit).await
    }

    pub async fn send_message(&self, text: impl Into<String>) -> Result<MessageRecord> {
        let text = text.into();
        self.request(|reply| Command::SendMessage { text, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.request(Command::Snapshot).await
    }
}

async fn run(
    mut session: ProctoredSession,
    mut rx: mpsc::UnboundedReceiver<Command>,
    signals: broadcast::Sender<Signal>,
    _subscriptions: Vec<Subscription>,
) {
    let session_id = session.id();

    while let Some(command) = rx.recv().await {
        match command {
            Command::Start(reply) => {
                let _ = reply.send(session.start());
            }
            Command::RecordAnswer {
                index,
                value,
                reply,
            } => {
                let _ = reply.send(session.record_answer(index, value));
            }
            Command::VisibilityLost(reply) => {
                let outcome = session.notify_visibility_lost().await;
                publish(&signals, &outcome);
                respond(session_id, "tab switch", reply, outcome);
            }
            Command::FullscreenChanged {
                is_fullscreen,
                reply,
            } => {
                let outcome = session.notify_fullscreen_change(is_fullscreen);
                publish(&signals, &outcome);
                respond(session_id, "fullscreen change", reply, outcome);
            }
            Command::Submit(reply) => {
                let _ = reply.send(session.submit().await);
            }
            Command::SendMessage { text, reply } => {
                let _ = reply.send(session.send_message(&text).await);
            }
            Command::IdentityChanged(user) => {
                if user.is_none() {
                    tracing::info!(session_id = %session_id, "Student signed out");
                }
                session.identity_changed(user.as_ref());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(Ok(session.snapshot()));
            }
        }
    }

    tracing::debug!(session_id = %session_id, "Session task stopped");
}

fn publish(signals: &broadcast::Sender<Signal>, outcome: &Result<Signal>) {
    if let Ok(signal) = outcome {
        // No receivers is fine.
        let _ = signals.send(signal.clone());
    }
}

fn respond<T>(session_id: Uuid, event: &str, reply: Option<Reply<T>>, outcome: Result<T>) {
    match reply {
        Some(reply) => {
            let _ = reply.send(outcome);
        }
        None => {
            if let Err(e) = outcome {
                tracing::debug!(session_id = %session_id, "Ignored {} event: {}", event, e);
            }
        }
    }
}
