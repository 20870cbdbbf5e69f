//! Session handle for communicating with a session actor.
//!
//! `SessionHandle` is a thin wrapper around an `mpsc::Sender<SessionCommand>`.
//! It provides async methods for all session operations and is cheap to clone.

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::api::{GameAction, SessionBroadcast};
use crate::stores::Identity;

use super::actor::{GameOutcome, LeaveOutcome, SessionCommand, SettingsChange};
use super::error::SessionError;

/// Handle for interacting with a session actor.
///
/// This is cheap to clone (just an `Arc` inside the `mpsc::Sender`).
/// All methods are async and communicate with the actor via message passing.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    token: String,
}

impl SessionHandle {
    /// Create a new handle from a command sender.
    pub(crate) fn new(tx: mpsc::Sender<SessionCommand>, token: String) -> Self {
        Self { tx, token }
    }

    /// Get the session token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Join the session.
    pub async fn join(&self, identity: Identity) -> Result<SessionBroadcast, SessionError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Join { identity, reply })
            .await
            .map_err(|_| SessionError::ActorShutdown)?;
        reply_rx.await.map_err(|_| SessionError::ActorShutdown)?
    }

    /// Apply a leader's pre-start settings change.
    pub async fn settings(
        &self,
        identity: Identity,
        change: SettingsChange,
    ) -> Result<SessionBroadcast, SessionError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Settings {
                identity,
                change,
                reply,
            })
            .await
            .map_err(|_| SessionError::ActorShutdown)?;
        reply_rx.await.map_err(|_| SessionError::ActorShutdown)?
    }

    /// Arm the game for its first countdown.
    pub async fn start(&self, identity: Identity) -> Result<SessionBroadcast, SessionError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Start { identity, reply })
            .await
            .map_err(|_| SessionError::ActorShutdown)?;
        reply_rx.await.map_err(|_| SessionError::ActorShutdown)?
    }

    /// Leave the session.
    pub async fn leave(&self, identity: Identity) -> Result<LeaveOutcome, SessionError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Leave { identity, reply })
            .await
            .map_err(|_| SessionError::ActorShutdown)?;
        reply_rx.await.map_err(|_| SessionError::ActorShutdown)?
    }

    /// Apply an in-game action.
    pub async fn game(
        &self,
        identity: Identity,
        action: GameAction,
    ) -> Result<GameOutcome, SessionError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Game {
                identity,
                action,
                reply,
            })
            .await
            .map_err(|_| SessionError::ActorShutdown)?;
        reply_rx.await.map_err(|_| SessionError::ActorShutdown)?
    }

    /// Current session snapshot, without mutating anything.
    pub async fn snapshot(&self) -> Result<SessionBroadcast, SessionError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Snapshot { reply })
            .await
            .map_err(|_| SessionError::ActorShutdown)?;
        reply_rx.await.map_err(|_| SessionError::ActorShutdown)
    }

    /// Subscribe to the session's broadcast stream.
    pub async fn subscribe(
        &self,
    ) -> Result<broadcast::Receiver<SessionBroadcast>, SessionError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Subscribe { reply })
            .await
            .map_err(|_| SessionError::ActorShutdown)?;
        reply_rx.await.map_err(|_| SessionError::ActorShutdown)
    }
}
