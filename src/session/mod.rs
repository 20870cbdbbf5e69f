//! Live session state and the game state machine.
//!
//! A [`Session`] binds one immutable [`QuizSnapshot`] to a set of players
//! and walks them through the question sequence in lockstep. All methods
//! here are synchronous and single-threaded; concurrency is handled one
//! level up by the per-session actor, which is the only writer.

mod actor;
mod error;
mod handle;
mod registry;

pub use actor::{CompletedGame, GameOutcome, LeaveOutcome, SessionActor, SettingsChange};
pub use error::SessionError;
pub use handle::SessionHandle;
pub use registry::SessionRegistry;

use std::collections::HashMap;
use std::time::Instant;

use crate::api::{
    AnswerView, PlayerView, QuizInfo, SessionBroadcast, SessionMessage, SessionState,
};
use crate::quiz::{QuestionSnapshot, QuizSnapshot};
use crate::stores::Identity;

// ============================================================================
// Answer Record
// ============================================================================

/// One recorded answer. A timeout slot carries no option and scores zero;
/// it is recorded explicitly, never silently omitted.
#[derive(Debug, Clone)]
pub struct AnswerRecord {
    pub option_id: Option<i64>,
    pub answer: Option<String>,
    pub score: u32,
    pub correct: bool,
}

impl AnswerRecord {
    pub fn answered(answer: String, option_id: i64, score: u32) -> Self {
        Self {
            option_id: Some(option_id),
            answer: Some(answer),
            score,
            correct: false,
        }
    }

    pub fn timeout() -> Self {
        Self {
            option_id: None,
            answer: None,
            score: 0,
            correct: false,
        }
    }
}

// ============================================================================
// Player
// ============================================================================

/// A joined player with their ordered answers and running aggregates.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: i64,
    pub username: String,
    /// Indexed by question index.
    pub answers: Vec<AnswerRecord>,
    pub score: u32,
    pub correct_answers: u32,
}

impl Player {
    fn new(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            username: identity.username.clone(),
            answers: Vec::new(),
            score: 0,
            correct_answers: 0,
        }
    }

    fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            username: self.username.clone(),
            answers: self
                .answers
                .iter()
                .map(|a| AnswerView {
                    answer_id: a.option_id,
                    answer: a.answer.clone(),
                    score: a.score,
                    correct: a.correct,
                })
                .collect(),
            score: self.score,
            amount_of_correct_answers: self.correct_answers,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// State machine for one live game.
#[derive(Debug)]
pub struct Session {
    token: String,
    leader: Identity,
    quiz: QuizSnapshot,
    players: Vec<Player>,
    state: SessionState,
    is_started: bool,
    current_question_index: usize,
    last_correct_answers: Vec<i64>,
    question_started_at: Option<Instant>,
}

impl Session {
    /// Create a session in the lobby state with the leader auto-joined.
    pub fn new(token: String, leader: Identity, quiz: QuizSnapshot) -> Self {
        let mut session = Self {
            token,
            leader: leader.clone(),
            quiz,
            players: Vec::new(),
            state: SessionState::Waiting,
            is_started: false,
            current_question_index: 0,
            last_correct_answers: Vec::new(),
            question_started_at: None,
        };
        session.add_player(&leader);
        session
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }

    pub fn is_leader(&self, identity: &Identity) -> bool {
        self.leader.username == identity.username
    }

    pub fn leader_username(&self) -> &str {
        &self.leader.username
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn quiz(&self) -> &QuizSnapshot {
        &self.quiz
    }

    pub fn timer(&self) -> u32 {
        self.quiz.timer
    }

    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    pub fn current_question(&self) -> Option<&QuestionSnapshot> {
        self.quiz.question(self.current_question_index)
    }

    /// Whether the active question is the last one.
    pub fn on_last_question(&self) -> bool {
        self.current_question_index + 1 >= self.quiz.question_count()
    }

    // ------------------------------------------------------------------------
    // Lobby Mutations
    // ------------------------------------------------------------------------

    /// Add a player. Joining twice with the same identity is a no-op;
    /// returns whether the player was actually added.
    pub fn add_player(&mut self, identity: &Identity) -> bool {
        if self
            .players
            .iter()
            .any(|p| p.username == identity.username || p.id == identity.id)
        {
            return false;
        }
        self.players.push(Player::new(identity));
        true
    }

    /// Remove a player by username; returns whether anyone was removed.
    pub fn remove_player(&mut self, username: &str) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.username != username);
        self.players.len() != before
    }

    /// Replace the quiz wholesale (pre-start only, enforced by the
    /// caller). Player identities survive; recorded progress does not.
    pub fn replace_quiz(&mut self, quiz: QuizSnapshot) {
        self.quiz = quiz;
        self.current_question_index = 0;
        self.last_correct_answers.clear();
        for player in &mut self.players {
            player.answers.clear();
            player.score = 0;
            player.correct_answers = 0;
        }
    }

    pub fn set_timer(&mut self, timer: u32) {
        self.quiz.timer = timer;
    }

    pub fn set_started(&mut self) {
        self.is_started = true;
        self.state = SessionState::Starting;
    }

    // ------------------------------------------------------------------------
    // Game Mutations
    // ------------------------------------------------------------------------

    pub fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    /// Reset the server-side question clock. Called on every transition
    /// into the quiz state.
    pub fn start_question_clock(&mut self) {
        self.question_started_at = Some(Instant::now());
    }

    /// Seconds since the active question was shown.
    pub fn question_elapsed(&self) -> f64 {
        self.question_started_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(1.0)
    }

    /// Record an answer for the active question. Ignored (returns false)
    /// if the player is unknown or already has an answer for this index.
    pub fn record_answer(
        &mut self,
        username: &str,
        answer: String,
        option_id: i64,
        score: u32,
    ) -> bool {
        let index = self.current_question_index;
        match self.players.iter_mut().find(|p| p.username == username) {
            Some(player) if player.answers.len() == index => {
                player
                    .answers
                    .push(AnswerRecord::answered(answer, option_id, score));
                true
            }
            _ => false,
        }
    }

    /// Whether every current player has an answer for the active question.
    pub fn all_players_answered(&self) -> bool {
        self.players
            .iter()
            .all(|p| p.answers.len() == self.current_question_index + 1)
    }

    /// Fill every missing slot up to the active question with a timeout
    /// record.
    pub fn fill_unanswered_with_null(&mut self) {
        let index = self.current_question_index;
        for player in &mut self.players {
            while player.answers.len() <= index {
                player.answers.push(AnswerRecord::timeout());
            }
        }
    }

    pub fn advance_question(&mut self) {
        self.current_question_index += 1;
    }

    /// All `(question_id, option_id)` pairs that need a correctness
    /// verdict, deduplicated.
    pub fn answered_option_pairs(&self) -> Vec<(i64, i64)> {
        let mut pairs = Vec::new();
        for player in &self.players {
            for (i, record) in player.answers.iter().enumerate() {
                let Some(option_id) = record.option_id else {
                    continue;
                };
                let Some(question) = self.quiz.question(i) else {
                    continue;
                };
                let pair = (question.id, option_id);
                if !pairs.contains(&pair) {
                    pairs.push(pair);
                }
            }
        }
        pairs
    }

    /// Recompute every player's aggregates from scratch against the
    /// given correctness verdicts. Idempotent: repeated application with
    /// the same verdicts never inflates counts.
    pub fn apply_correctness(&mut self, verdicts: &HashMap<(i64, i64), bool>) {
        let question_ids: Vec<i64> = self.quiz.questions.iter().map(|q| q.id).collect();
        for player in &mut self.players {
            player.score = 0;
            player.correct_answers = 0;
            for (i, record) in player.answers.iter_mut().enumerate() {
                let correct = record
                    .option_id
                    .zip(question_ids.get(i).copied())
                    .map(|(option_id, question_id)| {
                        verdicts.get(&(question_id, option_id)).copied().unwrap_or(false)
                    })
                    .unwrap_or(false);
                record.correct = correct;
                if correct {
                    player.score += record.score;
                    player.correct_answers += 1;
                }
            }
        }
    }

    pub fn set_last_correct_answers(&mut self, option_ids: Vec<i64>) {
        self.last_correct_answers = option_ids;
    }

    // ------------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------------

    /// Build the broadcast payload for the current state.
    ///
    /// Question content is attached only while a question is active;
    /// lobby, score and end snapshots never leak upcoming questions.
    pub fn broadcast(&self, message: SessionMessage) -> SessionBroadcast {
        let in_question = self.state == SessionState::Quiz;
        SessionBroadcast {
            leader_username: self.leader.username.clone(),
            players: self.players.iter().map(Player::view).collect(),
            message,
            token: self.token.clone(),
            is_started: self.is_started,
            amount_of_questions: self.quiz.question_count(),
            state: self.state,
            last_correct_answers: self.last_correct_answers.clone(),
            quiz: QuizInfo {
                id: self.quiz.id,
                title: self.quiz.title.clone(),
                description: self.quiz.description.clone(),
                thumbnail: self.quiz.thumbnail.clone(),
                timer: self.quiz.timer,
                username: self.quiz.owner.clone(),
            },
            current_question_index: in_question.then_some(self.current_question_index),
            quiz_question: if in_question {
                self.current_question().cloned()
            } else {
                None
            },
        }
    }
}
