//! Session error taxonomy.

use thiserror::Error;

use crate::stores::StoreError;

/// Errors produced while routing and applying session commands.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The identity token did not resolve to a known identity.
    #[error("invalid identity token")]
    Unauthorized,

    /// A leader-only command was issued by a non-leader.
    #[error("not the leader")]
    NotLeader,

    /// No live session for the token.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The command is valid but not allowed in the current state. The
    /// message is human-readable and also embedded in the error
    /// broadcast's `message` field.
    #[error("{0}")]
    InvalidState(String),

    /// The session actor is no longer running.
    #[error("session has shut down")]
    ActorShutdown,

    /// A collaborator lookup failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Result persistence failed; no partial attempts were written.
    #[error("finalization failed: {0}")]
    Finalize(String),
}
