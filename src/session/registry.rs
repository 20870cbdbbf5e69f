//! Session registry for managing actor lifecycles.
//!
//! The registry is responsible for:
//! - Minting unique join tokens
//! - Creating new session actors
//! - Looking up live sessions by token
//! - Graceful shutdown of all actors

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{SessionBroadcast, SessionMessage, TOKEN_LEN};
use crate::quiz::QuizSnapshot;
use crate::stores::{ContentStore, Identity};

use super::actor::SessionActor;
use super::error::SessionError;
use super::handle::SessionHandle;
use super::Session;

/// Alphabet for join tokens. Uppercase plus digits keeps them easy to
/// read out loud.
const TOKEN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Registry for session actors.
///
/// Manages the lifecycle of session actors: creation, lookup and shutdown.
/// Thread-safe and cheap to clone.
#[derive(Clone)]
pub struct SessionRegistry {
    /// Session handles by token.
    handles: Arc<DashMap<String, SessionHandle>>,
    /// Actor task handles for graceful shutdown.
    task_handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
    /// Canonical quiz content, snapshotted per session at creation.
    content: Arc<dyn ContentStore>,
    /// Shutdown signal sender.
    shutdown_tx: Arc<watch::Sender<bool>>,
    /// Shutdown signal receiver (cloned for each actor).
    shutdown_rx: watch::Receiver<bool>,
}

impl SessionRegistry {
    /// Create a new session registry.
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            handles: Arc::new(DashMap::new()),
            task_handles: Arc::new(Mutex::new(Vec::new())),
            content,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// Create a new session with `leader` as its leader.
    ///
    /// Fetches and snapshots the quiz first; an unknown quiz id fails
    /// before anything is inserted. The token is minted and the handle
    /// inserted atomically, so a colliding token is simply re-rolled.
    pub async fn create(
        &self,
        leader: Identity,
        quiz_id: i64,
    ) -> Result<(SessionHandle, SessionBroadcast), SessionError> {
        let record = self.content.fetch_quiz(quiz_id).await?;
        let snapshot = QuizSnapshot::from_record(record);

        loop {
            let token = generate_token();
            match self.handles.entry(token.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let session = Session::new(token.clone(), leader.clone(), snapshot);
                    let created = session.broadcast(SessionMessage::Create);

                    let (tx, task_handle) =
                        SessionActor::spawn(session, self.content.clone(), self.shutdown_rx.clone());
                    let handle = SessionHandle::new(tx, token.clone());
                    slot.insert(handle.clone());
                    self.task_handles.lock().await.push(task_handle);

                    info!(
                        session_token = %token,
                        quiz_id,
                        leader = %leader.username,
                        "Created session"
                    );
                    return Ok((handle, created));
                }
            }
        }
    }

    /// Get a session handle by token.
    pub fn get(&self, token: &str) -> Option<SessionHandle> {
        self.handles.get(token).map(|r| r.clone())
    }

    /// Check if a session exists.
    pub fn contains(&self, token: &str) -> bool {
        self.handles.contains_key(token)
    }

    /// Delete a session. Dropping the last handle stops the actor.
    pub fn delete(&self, token: &str) {
        if self.handles.remove(token).is_some() {
            debug!(session_token = %token, "Deleted session");
        }
    }

    /// Get the number of live sessions.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Gracefully shutdown all session actors.
    ///
    /// Sends the shutdown signal and waits for every actor to stop.
    pub async fn shutdown(&self) {
        info!("Shutting down session registry");

        if self.shutdown_tx.send(true).is_err() {
            warn!("Failed to send shutdown signal");
            return;
        }

        let task_handles = {
            let mut handles = self.task_handles.lock().await;
            std::mem::take(&mut *handles)
        };

        for task_handle in task_handles {
            if let Err(e) = task_handle.await {
                warn!(error = ?e, "Actor task panicked during shutdown");
            }
        }

        info!("Session registry shutdown complete");
    }
}

/// Mint a random join token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_CHARSET[rng.gen_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{OptionRecord, QuestionRecord, QuizRecord};
    use crate::stores::{MemoryContentStore, Role, StoreError};
    use std::collections::HashSet;

    fn identity(id: i64, name: &str) -> Identity {
        Identity {
            id,
            username: name.to_string(),
            role: Role::User,
        }
    }

    fn create_test_registry() -> SessionRegistry {
        let content = Arc::new(MemoryContentStore::new());
        content.insert(QuizRecord {
            id: 1,
            title: "Capitals".to_string(),
            description: "Geography".to_string(),
            thumbnail: "capitals.png".to_string(),
            timer: 20,
            owner: "alice".to_string(),
            questions: vec![QuestionRecord {
                id: 10,
                question: "Capital of Norway?".to_string(),
                options: vec![
                    OptionRecord {
                        id: 100,
                        text: "Oslo".to_string(),
                        correct: true,
                    },
                    OptionRecord {
                        id: 101,
                        text: "Bergen".to_string(),
                        correct: false,
                    },
                ],
            }],
        });
        SessionRegistry::new(content)
    }

    #[test]
    fn tokens_use_the_join_alphabet() {
        for _ in 0..50 {
            let token = generate_token();
            assert_eq!(token.len(), TOKEN_LEN);
            assert!(token.bytes().all(|b| TOKEN_CHARSET.contains(&b)));
        }
    }

    #[tokio::test]
    async fn create_session_returns_handle_and_snapshot() {
        let registry = create_test_registry();

        let (handle, created) = registry.create(identity(1, "alice"), 1).await.unwrap();

        assert_eq!(created.message, SessionMessage::Create);
        assert_eq!(created.leader_username, "alice");
        assert_eq!(created.players.len(), 1);
        assert_eq!(handle.token(), created.token);
        assert!(registry.get(handle.token()).is_some());

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn create_with_unknown_quiz_inserts_nothing() {
        let registry = create_test_registry();

        let err = registry.create(identity(1, "alice"), 999).await.unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::NotFound(_))));
        assert!(registry.is_empty());

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn tokens_are_unique_across_sessions() {
        let registry = create_test_registry();

        let mut tokens = HashSet::new();
        for i in 0..20 {
            let (handle, _) = registry
                .create(identity(i, &format!("user{i}")), 1)
                .await
                .unwrap();
            assert!(tokens.insert(handle.token().to_string()));
        }
        assert_eq!(registry.len(), 20);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let registry = create_test_registry();
        let (handle, _) = registry.create(identity(1, "alice"), 1).await.unwrap();
        let token = handle.token().to_string();

        registry.delete(&token);

        assert!(registry.get(&token).is_none());
        assert!(registry.is_empty());

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_token() {
        let registry = create_test_registry();
        assert!(registry.get("ZZZZZ").is_none());
        registry.shutdown().await;
    }
}
