//! External collaborator interfaces.
//!
//! The engine never talks to a database, an auth service or a user
//! directory directly. Everything it consumes or produces goes through
//! the narrow async traits defined here, with in-memory implementations
//! in [`memory`] used by tests and the demo server.
//!
//! Naming conventions follow the rest of the codebase:
//! - `fetch`/`find` - read a single entity, `NotFound` if absent
//! - `save`/`append` - persist, atomic for the whole argument
//! - `count` - aggregate query

pub mod memory;

pub use memory::{
    MemoryAttemptStore, MemoryContentStore, MemoryProgressionLedger, MemoryUserDirectory,
    StaticCredentialVerifier,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quiz::QuizRecord;

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by external collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The backend could not be reached or rejected the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Identity
// ============================================================================

/// A resolved client identity.
///
/// Produced by the [`CredentialVerifier`] from an opaque signed token;
/// the engine itself never validates signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

/// Resolves opaque identity tokens into identities.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn resolve(&self, identity_token: &str) -> Result<Identity, StoreError>;
}

// ============================================================================
// Content Store
// ============================================================================

/// Read access to canonical quiz content.
///
/// Correctness checks go through this trait rather than the session's
/// shuffled snapshot, so a tampered client payload can never flip an
/// option's correctness.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch a quiz with all questions and options.
    async fn fetch_quiz(&self, quiz_id: i64) -> Result<QuizRecord, StoreError>;

    /// Whether `option_id` is a correct option of `question_id`.
    async fn is_correct(&self, question_id: i64, option_id: i64) -> Result<bool, StoreError>;

    /// All correct option ids for a question.
    async fn correct_options(&self, question_id: i64) -> Result<Vec<i64>, StoreError>;
}

// ============================================================================
// User Directory
// ============================================================================

/// A user as known to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
}

/// Resolves identities to directory records and back.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, user_id: i64) -> Result<UserRecord, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<UserRecord, StoreError>;
}

// ============================================================================
// Attempt Store
// ============================================================================

/// One player's chosen option for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptAnswer {
    pub question_id: i64,
    /// `None` records a timeout; the slot is never silently omitted.
    pub option_id: Option<i64>,
}

/// One player's completed record for one finished play-through.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub quiz_id: i64,
    pub user_id: i64,
    pub username: String,
    pub answers: Vec<AttemptAnswer>,
    pub xp_earned: u32,
    pub completed_at: DateTime<Utc>,
}

/// All attempts from one live session, grouped under one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResultRecord {
    pub quiz_id: i64,
    pub session_token: String,
    pub attempts: Vec<AttemptRecord>,
}

/// Append-only persistence for finished attempts.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Completions of `quiz_id` by `username` since `since`.
    async fn count_recent_attempts(
        &self,
        username: &str,
        quiz_id: i64,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError>;

    /// Persist a whole session's attempts. Atomic: either every attempt
    /// in the record is stored or none is.
    async fn save_session(&self, record: GameResultRecord) -> Result<(), StoreError>;
}

// ============================================================================
// Progression Ledger
// ============================================================================

/// Applies earned XP and owns level-up bookkeeping.
#[async_trait]
pub trait ProgressionLedger: Send + Sync {
    async fn award_xp(&self, user_id: i64, xp: u32) -> Result<(), StoreError>;
}
