//! Result finalization for finished games.
//!
//! Runs exactly once per session, after the terminal broadcast. Turns
//! the in-memory game outcome into durable attempt records and XP
//! awards:
//!
//! 1. Resolve the quiz against the content store
//! 2. Validate every player against the user directory
//! 3. Compute per-player XP (repetition-reduced; the quiz owner earns 0)
//! 4. Persist the whole session's attempts atomically
//! 5. Apply XP, plus a flat owner bonus per other player
//!
//! Repetition counts are read before the save so a player's own fresh
//! attempt never reduces its XP.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::score::{self, OWNER_XP_BONUS};
use crate::session::{CompletedGame, SessionError};
use crate::stores::{
    AttemptAnswer, AttemptRecord, AttemptStore, ContentStore, GameResultRecord, ProgressionLedger,
    StoreError, UserDirectory,
};

/// Completions inside this trailing window reduce XP for repeats.
const ATTEMPT_WINDOW_DAYS: i64 = 30;

/// Persists finished games and applies progression.
#[derive(Clone)]
pub struct Finalizer {
    content: Arc<dyn ContentStore>,
    users: Arc<dyn UserDirectory>,
    attempts: Arc<dyn AttemptStore>,
    progression: Arc<dyn ProgressionLedger>,
}

impl Finalizer {
    pub fn new(
        content: Arc<dyn ContentStore>,
        users: Arc<dyn UserDirectory>,
        attempts: Arc<dyn AttemptStore>,
        progression: Arc<dyn ProgressionLedger>,
    ) -> Self {
        Self {
            content,
            users,
            attempts,
            progression,
        }
    }

    /// Persist one finished game and award XP.
    ///
    /// All-or-nothing on the persistence side: if the quiz is gone or
    /// any player fails to validate, no attempt is written. XP awards
    /// happen only after the save succeeded.
    pub async fn finalize(&self, game: CompletedGame) -> Result<GameResultRecord, SessionError> {
        // The quiz must still exist at finalization time; an attempt
        // for a deleted quiz would be unresolvable later.
        self.content.fetch_quiz(game.quiz.id).await.map_err(|e| {
            SessionError::Finalize(format!("quiz {} failed validation: {e}", game.quiz.id))
        })?;

        let question_count = game.quiz.question_count();
        let question_ids: Vec<i64> = game.quiz.questions.iter().map(|q| q.id).collect();
        let since = Utc::now() - Duration::days(ATTEMPT_WINDOW_DAYS);
        let completed_at = Utc::now();

        // Validate players and compute XP before writing anything.
        let mut records = Vec::with_capacity(game.players.len());
        for player in &game.players {
            self.users.find_by_id(player.id).await.map_err(|e| {
                SessionError::Finalize(format!("player {} failed validation: {e}", player.username))
            })?;

            let xp = if player.username == game.quiz.owner {
                // Owners never earn play XP from their own quiz.
                0
            } else {
                let reduction = self
                    .attempts
                    .count_recent_attempts(&player.username, game.quiz.id, since)
                    .await?;
                score::attempt_xp(player.score, question_count, player.correct_answers, reduction)
            };

            let answers = (0..question_count)
                .map(|i| AttemptAnswer {
                    question_id: question_ids[i],
                    option_id: player.answers.get(i).and_then(|a| a.option_id),
                })
                .collect();

            records.push(AttemptRecord {
                quiz_id: game.quiz.id,
                user_id: player.id,
                username: player.username.clone(),
                answers,
                xp_earned: xp,
                completed_at,
            });
        }

        let result = GameResultRecord {
            quiz_id: game.quiz.id,
            session_token: game.token.clone(),
            attempts: records,
        };
        self.attempts.save_session(result.clone()).await?;

        for attempt in &result.attempts {
            if attempt.xp_earned > 0 {
                self.progression
                    .award_xp(attempt.user_id, attempt.xp_earned)
                    .await?;
            }
        }
        self.award_owner_bonus(&game).await?;

        info!(
            session_token = %game.token,
            quiz_id = game.quiz.id,
            leader = %game.leader_username,
            players = result.attempts.len(),
            "Finalized game results"
        );
        Ok(result)
    }

    /// Flat bonus to the quiz owner for every other player who finished.
    ///
    /// An owner who no longer exists in the directory loses the bonus
    /// but never blocks the already-persisted attempts.
    async fn award_owner_bonus(&self, game: &CompletedGame) -> Result<(), SessionError> {
        let other_players = game
            .players
            .iter()
            .filter(|p| p.username != game.quiz.owner)
            .count() as u32;
        if other_players == 0 {
            return Ok(());
        }

        let owner = match self.users.find_by_username(&game.quiz.owner).await {
            Ok(owner) => owner,
            Err(StoreError::NotFound(_)) => {
                warn!(
                    quiz_id = game.quiz.id,
                    owner = %game.quiz.owner,
                    "Quiz owner not found, skipping owner bonus"
                );
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        self.progression
            .award_xp(owner.id, OWNER_XP_BONUS * other_players)
            .await?;
        Ok(())
    }
}
