//! In-memory collaborator implementations.
//!
//! Used by the test suite and the demo server. Concurrency-safe via
//! `DashMap` so they can back a running server without extra locking.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::{
    AttemptStore, ContentStore, CredentialVerifier, GameResultRecord, Identity, ProgressionLedger,
    StoreError, UserDirectory, UserRecord,
};
use crate::quiz::QuizRecord;

// ============================================================================
// Credential Verifier
// ============================================================================

/// Verifier backed by a static token table.
///
/// Tokens are registered up front; anything else resolves to an error.
#[derive(Default)]
pub struct StaticCredentialVerifier {
    tokens: DashMap<String, Identity>,
}

impl StaticCredentialVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: impl Into<String>, identity: Identity) {
        self.tokens.insert(token.into(), identity);
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentialVerifier {
    async fn resolve(&self, identity_token: &str) -> Result<Identity, StoreError> {
        self.tokens
            .get(identity_token)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound("identity".to_string()))
    }
}

// ============================================================================
// Content Store
// ============================================================================

/// Content store over a map of quiz records.
#[derive(Default)]
pub struct MemoryContentStore {
    quizzes: DashMap<i64, QuizRecord>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, quiz: QuizRecord) {
        self.quizzes.insert(quiz.id, quiz);
    }

    pub fn remove(&self, quiz_id: i64) {
        self.quizzes.remove(&quiz_id);
    }

    fn with_question<T>(
        &self,
        question_id: i64,
        f: impl Fn(&crate::quiz::QuestionRecord) -> T,
    ) -> Result<T, StoreError> {
        for entry in self.quizzes.iter() {
            if let Some(question) = entry.questions.iter().find(|q| q.id == question_id) {
                return Ok(f(question));
            }
        }
        Err(StoreError::NotFound(format!("question {question_id}")))
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn fetch_quiz(&self, quiz_id: i64) -> Result<QuizRecord, StoreError> {
        self.quizzes
            .get(&quiz_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound(format!("quiz {quiz_id}")))
    }

    async fn is_correct(&self, question_id: i64, option_id: i64) -> Result<bool, StoreError> {
        self.with_question(question_id, |q| {
            q.options.iter().any(|o| o.id == option_id && o.correct)
        })
    }

    async fn correct_options(&self, question_id: i64) -> Result<Vec<i64>, StoreError> {
        self.with_question(question_id, |q| q.correct_option_ids())
    }
}

// ============================================================================
// User Directory
// ============================================================================

#[derive(Default)]
pub struct MemoryUserDirectory {
    users: DashMap<i64, UserRecord>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: UserRecord) {
        self.users.insert(user.id, user);
    }

    pub fn remove(&self, user_id: i64) {
        self.users.remove(&user_id);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, user_id: i64) -> Result<UserRecord, StoreError> {
        self.users
            .get(&user_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))
    }

    async fn find_by_username(&self, username: &str) -> Result<UserRecord, StoreError> {
        self.users
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound(format!("user {username}")))
    }
}

// ============================================================================
// Attempt Store
// ============================================================================

/// Append-only attempt log.
#[derive(Default)]
pub struct MemoryAttemptStore {
    saved: Mutex<Vec<GameResultRecord>>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything persisted so far, in save order.
    pub async fn saved(&self) -> Vec<GameResultRecord> {
        self.saved.lock().await.clone()
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn count_recent_attempts(
        &self,
        username: &str,
        quiz_id: i64,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let saved = self.saved.lock().await;
        let count = saved
            .iter()
            .flat_map(|record| record.attempts.iter())
            .filter(|attempt| {
                attempt.username == username
                    && attempt.quiz_id == quiz_id
                    && attempt.completed_at >= since
            })
            .count();
        Ok(count as u32)
    }

    async fn save_session(&self, record: GameResultRecord) -> Result<(), StoreError> {
        self.saved.lock().await.push(record);
        Ok(())
    }
}

// ============================================================================
// Progression Ledger
// ============================================================================

/// A user's progression state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub level: u32,
    pub xp: u32,
}

/// Ledger with a fixed level table.
///
/// `thresholds` maps a target level to the XP required to reach it from
/// the level below. Users start at level 1 with 0 XP.
pub struct MemoryProgressionLedger {
    thresholds: Arc<Vec<(u32, u32)>>,
    progress: DashMap<i64, Progress>,
}

impl MemoryProgressionLedger {
    pub fn new(thresholds: Vec<(u32, u32)>) -> Self {
        Self {
            thresholds: Arc::new(thresholds),
            progress: DashMap::new(),
        }
    }

    pub fn progress(&self, user_id: i64) -> Progress {
        self.progress
            .get(&user_id)
            .map(|entry| *entry)
            .unwrap_or(Progress { level: 1, xp: 0 })
    }

    fn threshold_for(&self, level: u32) -> Option<u32> {
        self.thresholds
            .iter()
            .find(|(l, _)| *l == level)
            .map(|(_, xp)| *xp)
    }
}

#[async_trait]
impl ProgressionLedger for MemoryProgressionLedger {
    async fn award_xp(&self, user_id: i64, xp: u32) -> Result<(), StoreError> {
        let mut entry = self
            .progress
            .entry(user_id)
            .or_insert(Progress { level: 1, xp: 0 });
        entry.xp += xp;
        loop {
            match self.threshold_for(entry.level + 1) {
                // No further level defined: remaining XP resets.
                None => {
                    entry.xp = 0;
                    break;
                }
                Some(needed) if entry.xp < needed => break,
                Some(needed) => {
                    entry.xp -= needed;
                    entry.level += 1;
                }
            }
        }
        Ok(())
    }
}
