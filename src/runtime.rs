//! Per-user session runtime
//!
//! Every user gets a task that owns their session and processes their
//! messages one at a time, in arrival order. Different users run
//! concurrently and share only the credential store and the OAuth flow.
//! Idle sessions are dropped after a period without messages.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionExecutor;
pub use traits::*;

use crate::session::{InboundMessage, UserId, UserSession};
use crate::state_machine::ComposeState;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};

/// How long an idle session lingers without messages before its task exits
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Handle to a running session task
struct SessionHandle {
    inbox: mpsc::UnboundedSender<InboundMessage>,
    #[cfg(test)]
    session: Arc<Mutex<UserSession>>,
}

/// Session repository and router for inbound messages
pub struct Dispatcher {
    executor: Arc<SessionExecutor>,
    sessions: Arc<RwLock<HashMap<UserId, SessionHandle>>>,
    idle_timeout: Duration,
}

impl Dispatcher {
    pub fn new(executor: SessionExecutor, idle_timeout: Duration) -> Self {
        Self {
            executor: Arc::new(executor),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Queue a message for its user's session, creating the session on
    /// first contact.
    ///
    /// Never waits on a session: a user with a slow publish in flight does
    /// not hold up anyone else.
    pub async fn dispatch(&self, message: InboundMessage) {
        // Sends happen under the map lock so an evicting task cannot drop
        // its inbox between lookup and send
        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(&message.user) {
                send(handle, message);
                return;
            }
        }

        let mut sessions = self.sessions.write().await;
        // Another caller may have created it while we waited for the lock
        if let Some(handle) = sessions.get(&message.user) {
            send(handle, message);
            return;
        }

        let user = message.user;
        let handle = self.spawn_session(user);
        send(&handle, message);
        sessions.insert(user, handle);
        tracing::debug!(user_id = %user, sessions = sessions.len(), "Created session");
    }

    fn spawn_session(&self, user: UserId) -> SessionHandle {
        let (inbox, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Mutex::new(UserSession::default()));
        tokio::spawn(run_session(SessionTask {
            user,
            executor: Arc::clone(&self.executor),
            sessions: Arc::clone(&self.sessions),
            session: Arc::clone(&session),
            idle_timeout: self.idle_timeout,
            inbox: rx,
        }));

        SessionHandle {
            inbox,
            #[cfg(test)]
            session,
        }
    }

    /// Copy of a user's session, if they have one
    #[cfg(test)]
    pub async fn session(&self, user: UserId) -> Option<UserSession> {
        let session = {
            let sessions = self.sessions.read().await;
            Arc::clone(&sessions.get(&user)?.session)
        };
        let snapshot = session.lock().await.clone();
        Some(snapshot)
    }

    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn send(handle: &SessionHandle, message: InboundMessage) {
    let user = message.user;
    if handle.inbox.send(message).is_err() {
        tracing::error!(user_id = %user, "Session task is gone, dropping message");
    }
}

struct SessionTask {
    user: UserId,
    executor: Arc<SessionExecutor>,
    sessions: Arc<RwLock<HashMap<UserId, SessionHandle>>>,
    session: Arc<Mutex<UserSession>>,
    idle_timeout: Duration,
    inbox: mpsc::UnboundedReceiver<InboundMessage>,
}

async fn run_session(mut task: SessionTask) {
    loop {
        match tokio::time::timeout(task.idle_timeout, task.inbox.recv()).await {
            Ok(Some(message)) => {
                let mut session = task.session.lock().await;
                task.executor.handle(&mut session, &message).await;
            }
            Ok(None) => break,
            Err(_) => {
                if try_evict(&task).await {
                    break;
                }
            }
        }
    }
    tracing::debug!(user_id = %task.user, "Session task stopped");
}

/// Remove the session from the map if it holds nothing worth keeping.
///
/// Holding the write lock excludes `dispatch`, so an empty inbox stays
/// empty until the handle is gone.
async fn try_evict(task: &SessionTask) -> bool {
    let mut sessions = task.sessions.write().await;
    if !task.inbox.is_empty() || task.session.lock().await.state != ComposeState::Idle {
        return false;
    }
    sessions.remove(&task.user);
    tracing::debug!(user_id = %task.user, sessions = sessions.len(), "Evicted idle session");
    true
}
