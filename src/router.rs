//! Command routing: authentication, session lookup and lifecycle glue.
//!
//! The router sits between the transport and the session actors. Every
//! inbound command is authenticated first; then it is forwarded to the
//! right actor. The router also owns the two lifecycle reactions actors
//! cannot perform themselves: deleting a session when its leader leaves
//! and finalizing results when a game ends.

use crate::api::{ClientCommand, SessionBroadcast};
use crate::finalize::Finalizer;
use crate::session::{
    SessionError, SessionHandle, SessionRegistry, SettingsChange,
};
use crate::stores::{CredentialVerifier, Identity, StoreError};
use std::sync::Arc;
use tracing::{error, info};

/// Result of dispatching one client command.
#[derive(Debug)]
pub struct Dispatch {
    /// Direct reply for the issuing client. `None` for commands that
    /// are accepted silently.
    pub reply: Option<SessionBroadcast>,
    /// Present when the client entered a session and should start
    /// receiving its broadcasts.
    pub subscribe: Option<SessionHandle>,
}

/// Routes authenticated client commands to session actors.
#[derive(Clone)]
pub struct CommandRouter {
    verifier: Arc<dyn CredentialVerifier>,
    registry: SessionRegistry,
    finalizer: Finalizer,
}

impl CommandRouter {
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        registry: SessionRegistry,
        finalizer: Finalizer,
    ) -> Self {
        Self {
            verifier,
            registry,
            finalizer,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Authenticate and dispatch one command.
    pub async fn dispatch(&self, command: ClientCommand) -> Result<Dispatch, SessionError> {
        match command {
            ClientCommand::Create {
                quiz_id,
                identity_token,
            } => {
                let identity = self.authenticate(&identity_token).await?;
                let (handle, created) = self.registry.create(identity, quiz_id).await?;
                Ok(Dispatch {
                    reply: Some(created),
                    subscribe: Some(handle),
                })
            }

            ClientCommand::Join {
                token,
                identity_token,
            } => {
                let identity = self.authenticate(&identity_token).await?;
                let handle = self.session(&token)?;
                let broadcast = handle.join(identity).await?;
                Ok(Dispatch {
                    reply: Some(broadcast),
                    subscribe: Some(handle),
                })
            }

            ClientCommand::Settings {
                token,
                identity_token,
                set_new_quiz,
                quiz_id,
                change_timer,
                timer,
            } => {
                let identity = self.authenticate(&identity_token).await?;
                let handle = self.session(&token)?;
                // A raised flag without its payload is a malformed
                // command, not an empty change.
                let quiz_id = match (set_new_quiz, quiz_id) {
                    (true, None) => {
                        return Err(SessionError::InvalidState(
                            "setNewQuiz requires a quizId".to_string(),
                        ));
                    }
                    (true, id) => id,
                    (false, _) => None,
                };
                let timer = match (change_timer, timer) {
                    (true, None) => {
                        return Err(SessionError::InvalidState(
                            "changeTimer requires a timer".to_string(),
                        ));
                    }
                    (true, t) => t,
                    (false, _) => None,
                };
                let change = SettingsChange { quiz_id, timer };
                let broadcast = handle.settings(identity, change).await?;
                Ok(Dispatch {
                    reply: Some(broadcast),
                    subscribe: None,
                })
            }

            ClientCommand::Start {
                token,
                identity_token,
            } => {
                let identity = self.authenticate(&identity_token).await?;
                let handle = self.session(&token)?;
                let broadcast = handle.start(identity).await?;
                Ok(Dispatch {
                    reply: Some(broadcast),
                    subscribe: None,
                })
            }

            ClientCommand::Leave {
                token,
                identity_token,
            } => {
                let identity = self.authenticate(&identity_token).await?;
                let handle = self.session(&token)?;
                let outcome = handle.leave(identity).await?;
                if outcome.leader_left {
                    info!(session_token = %token, "Leader left, dissolving session");
                    self.registry.delete(&token);
                }
                Ok(Dispatch {
                    reply: Some(outcome.broadcast),
                    subscribe: None,
                })
            }

            ClientCommand::Game {
                token,
                identity_token,
                action,
            } => {
                let identity = self.authenticate(&identity_token).await?;
                let handle = self.session(&token)?;
                let outcome = handle.game(identity, action).await?;

                if let Some(completed) = outcome.completed {
                    // The game is over either way; the session never
                    // outlives its finalization attempt.
                    let finalized = self.finalizer.finalize(completed).await;
                    self.registry.delete(&token);
                    if let Err(e) = finalized {
                        error!(
                            session_token = %token,
                            error = %e,
                            "Failed to finalize game results"
                        );
                        return Err(e);
                    }
                }

                Ok(Dispatch {
                    reply: outcome.broadcast,
                    subscribe: None,
                })
            }
        }
    }

    async fn authenticate(&self, identity_token: &str) -> Result<Identity, SessionError> {
        self.verifier
            .resolve(identity_token)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => SessionError::Unauthorized,
                other => SessionError::Store(other),
            })
    }

    fn session(&self, token: &str) -> Result<SessionHandle, SessionError> {
        self.registry
            .get(token)
            .ok_or_else(|| SessionError::SessionNotFound(token.to_string()))
    }
}
