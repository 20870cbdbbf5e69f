//! Per-session actor for serialized game mutations.
//!
//! Each live session gets a dedicated actor task that:
//! - Serializes all mutations via message passing (no locks)
//! - Owns the state machine and the broadcast channel
//! - Resolves answer correctness against the content store at reveal time
//!
//! Commands arrive over an mpsc channel with a oneshot reply; accepted
//! mutations additionally publish a full snapshot to every subscriber.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::api::{GameAction, SessionBroadcast, SessionMessage, SessionState};
use crate::quiz::QuizSnapshot;
use crate::score;
use crate::stores::{ContentStore, Identity};

use super::error::SessionError;
use super::{Player, Session};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Channel capacity for commands.
///
/// If this fills up, callers block on send(), causing backpressure.
const CHANNEL_CAPACITY: usize = 64;

/// Capacity of the per-session broadcast channel. Subscribers that lag
/// behind this many snapshots start losing messages.
const BROADCAST_CAPACITY: usize = 128;

/// A game cannot start with fewer players than this.
const MIN_PLAYERS: usize = 2;

/// Smallest accepted per-question timer, in seconds.
const MIN_TIMER_SECS: u32 = 5;

// ============================================================================
// Session Command
// ============================================================================

/// Commands that can be sent to a session actor.
pub enum SessionCommand {
    Join {
        identity: Identity,
        reply: oneshot::Sender<Result<SessionBroadcast, SessionError>>,
    },
    Settings {
        identity: Identity,
        change: SettingsChange,
        reply: oneshot::Sender<Result<SessionBroadcast, SessionError>>,
    },
    Start {
        identity: Identity,
        reply: oneshot::Sender<Result<SessionBroadcast, SessionError>>,
    },
    Leave {
        identity: Identity,
        reply: oneshot::Sender<Result<LeaveOutcome, SessionError>>,
    },
    Game {
        identity: Identity,
        action: GameAction,
        reply: oneshot::Sender<Result<GameOutcome, SessionError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionBroadcast>,
    },
    Subscribe {
        reply: oneshot::Sender<broadcast::Receiver<SessionBroadcast>>,
    },
}

/// A leader's pre-start settings change. Empty fields are left untouched.
#[derive(Debug, Default)]
pub struct SettingsChange {
    /// Swap the session to a different quiz.
    pub quiz_id: Option<i64>,
    /// New per-question timer, in seconds.
    pub timer: Option<u32>,
}

/// Result of a leave command.
#[derive(Debug)]
pub struct LeaveOutcome {
    pub broadcast: SessionBroadcast,
    /// A leaving leader dissolves the session; the registry owner
    /// reacts by deleting it.
    pub leader_left: bool,
}

/// Result of an in-game command.
#[derive(Debug)]
pub struct GameOutcome {
    /// `None` when the command was accepted silently (an answer that
    /// did not complete the round).
    pub broadcast: Option<SessionBroadcast>,
    /// Present exactly once, when the game reached its terminal state.
    pub completed: Option<CompletedGame>,
}

/// Everything finalization needs, exported when a game ends. The actor
/// keeps no interest in the data after this point.
#[derive(Debug)]
pub struct CompletedGame {
    pub token: String,
    pub leader_username: String,
    pub quiz: QuizSnapshot,
    pub players: Vec<Player>,
}

// ============================================================================
// Session Actor
// ============================================================================

/// Per-session actor that owns state and handles mutations.
pub struct SessionActor {
    session: Session,
    content: Arc<dyn ContentStore>,
    events: broadcast::Sender<SessionBroadcast>,
    command_rx: mpsc::Receiver<SessionCommand>,
    shutdown_rx: watch::Receiver<bool>,
}

impl SessionActor {
    /// Spawn an actor for a freshly created session.
    ///
    /// Returns the command sender and a JoinHandle for the actor task.
    pub fn spawn(
        session: Session,
        content: Arc<dyn ContentStore>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> (mpsc::Sender<SessionCommand>, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (events, _) = broadcast::channel(BROADCAST_CAPACITY);

        let actor = Self {
            session,
            content,
            events,
            command_rx: rx,
            shutdown_rx,
        };

        let handle = tokio::spawn(actor.run());
        (tx, handle)
    }

    /// Main command processing loop.
    async fn run(mut self) {
        debug!(session_token = %self.session.token(), "Session actor started");

        loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        debug!(
                            session_token = %self.session.token(),
                            "Session actor received shutdown signal"
                        );
                        break;
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            // All handles dropped, the session was deleted.
                            debug!(
                                session_token = %self.session.token(),
                                "All handles dropped, shutting down"
                            );
                            break;
                        }
                    }
                }
            }
        }

        debug!(session_token = %self.session.token(), "Session actor stopped");
    }

    /// Handle a single command.
    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Join { identity, reply } => {
                let result = self.join(identity);
                let _ = reply.send(result);
            }
            SessionCommand::Settings {
                identity,
                change,
                reply,
            } => {
                let result = self.settings(identity, change).await;
                let _ = reply.send(result);
            }
            SessionCommand::Start { identity, reply } => {
                let result = self.start(identity);
                let _ = reply.send(result);
            }
            SessionCommand::Leave { identity, reply } => {
                let result = self.leave(identity);
                let _ = reply.send(result);
            }
            SessionCommand::Game {
                identity,
                action,
                reply,
            } => {
                let result = self.game(identity, action).await;
                let _ = reply.send(result);
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.session.broadcast(SessionMessage::Update));
            }
            SessionCommand::Subscribe { reply } => {
                let _ = reply.send(self.events.subscribe());
            }
        }
    }

    // ------------------------------------------------------------------------
    // Lobby Operations
    // ------------------------------------------------------------------------

    fn join(&mut self, identity: Identity) -> Result<SessionBroadcast, SessionError> {
        if self.session.is_started() {
            return Err(self.reject("The game has already started"));
        }

        if self.session.add_player(&identity) {
            Ok(self.publish(SessionMessage::Join))
        } else {
            // Re-join with the same identity is a no-op: the caller gets
            // the current snapshot, subscribers see nothing.
            Ok(self.session.broadcast(SessionMessage::Join))
        }
    }

    async fn settings(
        &mut self,
        identity: Identity,
        change: SettingsChange,
    ) -> Result<SessionBroadcast, SessionError> {
        if !self.session.is_leader(&identity) {
            return Err(SessionError::NotLeader);
        }
        if self.session.is_started() {
            return Err(self.reject("Settings cannot change after the game has started"));
        }

        // Validate everything before mutating anything.
        if let Some(timer) = change.timer {
            if timer < MIN_TIMER_SECS {
                return Err(self.reject("Timer must be at least 5 seconds"));
            }
        }

        if let Some(quiz_id) = change.quiz_id {
            let record = self.content.fetch_quiz(quiz_id).await?;
            self.session.replace_quiz(QuizSnapshot::from_record(record));
        }
        if let Some(timer) = change.timer {
            self.session.set_timer(timer);
        }

        Ok(self.publish(SessionMessage::Update))
    }

    fn start(&mut self, identity: Identity) -> Result<SessionBroadcast, SessionError> {
        if !self.session.is_leader(&identity) {
            return Err(SessionError::NotLeader);
        }
        if self.session.is_started() {
            return Err(self.reject("The game has already started"));
        }
        if self.session.player_count() < MIN_PLAYERS {
            return Err(self.reject("Not enough players to start the game"));
        }

        self.session.set_started();
        Ok(self.publish(SessionMessage::Start))
    }

    fn leave(&mut self, identity: Identity) -> Result<LeaveOutcome, SessionError> {
        let leader_left = self.session.is_leader(&identity);
        self.session.remove_player(&identity.username);

        let broadcast = self.publish(SessionMessage::Leave {
            leader: leader_left,
            user: identity.username,
        });

        Ok(LeaveOutcome {
            broadcast,
            leader_left,
        })
    }

    // ------------------------------------------------------------------------
    // Game Operations
    // ------------------------------------------------------------------------

    async fn game(
        &mut self,
        identity: Identity,
        action: GameAction,
    ) -> Result<GameOutcome, SessionError> {
        match action {
            GameAction::FirstCountDown => self.first_countdown(),
            GameAction::Next => self.next(identity).await,
            GameAction::Answer { answer, answer_id } => {
                self.answer(identity, answer, answer_id).await
            }
        }
    }

    /// The lobby countdown finished: show the first question.
    ///
    /// Any player's countdown signal counts; clients race to report it
    /// and only the first one transitions the state.
    fn first_countdown(&mut self) -> Result<GameOutcome, SessionError> {
        if self.session.state() != SessionState::Starting {
            return Err(self.reject("The game is not waiting for its countdown"));
        }

        self.session.set_state(SessionState::Quiz);
        self.session.start_question_clock();

        Ok(GameOutcome {
            broadcast: Some(self.publish(SessionMessage::Next)),
            completed: None,
        })
    }

    /// Leader advances the game.
    ///
    /// From the live question this closes the round: the score view for
    /// an intermediate question, the terminal state after the last one
    /// (this is also the timeout path when not everyone answered). From
    /// the score view it moves to the next question. Any other state is
    /// forced back to a live question.
    async fn next(&mut self, identity: Identity) -> Result<GameOutcome, SessionError> {
        if !self.session.is_leader(&identity) {
            return Err(SessionError::NotLeader);
        }

        match self.session.state() {
            SessionState::Quiz if self.session.on_last_question() => {
                self.session.fill_unanswered_with_null();
                self.resolve_scores().await?;
                self.session.set_state(SessionState::End);
                let broadcast = self.publish(SessionMessage::End);
                Ok(GameOutcome {
                    broadcast: Some(broadcast),
                    completed: Some(self.export_completed()),
                })
            }
            SessionState::Quiz => {
                self.resolve_scores().await?;
                self.session.set_state(SessionState::Score);
                Ok(GameOutcome {
                    broadcast: Some(self.publish(SessionMessage::ShowAnswer)),
                    completed: None,
                })
            }
            SessionState::Score => {
                self.session.fill_unanswered_with_null();
                self.session.advance_question();
                self.session.set_state(SessionState::Quiz);
                self.session.start_question_clock();
                Ok(GameOutcome {
                    broadcast: Some(self.publish(SessionMessage::Next)),
                    completed: None,
                })
            }
            _ => {
                // Out-of-order next snaps the game back to a live
                // question rather than failing.
                self.session.set_state(SessionState::Quiz);
                self.session.start_question_clock();
                Ok(GameOutcome {
                    broadcast: Some(self.publish(SessionMessage::Next)),
                    completed: None,
                })
            }
        }
    }

    /// A player answers the active question.
    ///
    /// The score is computed server-side from the question clock. The
    /// round is revealed automatically once every player has answered;
    /// until then nothing is broadcast.
    async fn answer(
        &mut self,
        identity: Identity,
        answer: String,
        answer_id: i64,
    ) -> Result<GameOutcome, SessionError> {
        if self.session.state() != SessionState::Quiz {
            return Err(self.reject("No question is active"));
        }

        let elapsed = self.session.question_elapsed();
        let points = score::answer_score(elapsed, self.session.timer());
        self.session
            .record_answer(&identity.username, answer, answer_id, points);

        if self.session.all_players_answered() {
            // Everyone is in: show the answers early. The state stays on
            // the live question until the leader advances.
            self.resolve_scores().await?;
            return Ok(GameOutcome {
                broadcast: Some(self.publish(SessionMessage::ShowAnswer)),
                completed: None,
            });
        }

        Ok(GameOutcome {
            broadcast: None,
            completed: None,
        })
    }

    /// Resolve correctness against the content store, recompute player
    /// aggregates and record the revealed option ids.
    ///
    /// Correctness is resolved from canonical content, never from the
    /// client payload, so a tampered answer id can only ever be wrong.
    /// Aggregates are rebuilt from scratch, so resolving the same round
    /// twice (early reveal, then the leader's next) never double-counts.
    async fn resolve_scores(&mut self) -> Result<(), SessionError> {
        let mut verdicts = std::collections::HashMap::new();
        for (question_id, option_id) in self.session.answered_option_pairs() {
            let correct = self.content.is_correct(question_id, option_id).await?;
            verdicts.insert((question_id, option_id), correct);
        }
        self.session.apply_correctness(&verdicts);

        let correct_options = match self.session.current_question() {
            Some(question) => self.content.correct_options(question.id).await?,
            None => Vec::new(),
        };
        self.session.set_last_correct_answers(correct_options);
        Ok(())
    }

    fn export_completed(&self) -> CompletedGame {
        CompletedGame {
            token: self.session.token().to_string(),
            leader_username: self.session.leader_username().to_string(),
            quiz: self.session.quiz().clone(),
            players: self.session.players().to_vec(),
        }
    }

    // ------------------------------------------------------------------------
    // Publishing
    // ------------------------------------------------------------------------

    /// Build the snapshot for `message` and push it to all subscribers.
    /// Fire-and-forget: a closed or lagging subscriber never blocks the
    /// actor.
    fn publish(&self, message: SessionMessage) -> SessionBroadcast {
        let snapshot = self.session.broadcast(message);
        let _ = self.events.send(snapshot.clone());
        snapshot
    }

    /// Reject a command that is valid but not allowed right now. The
    /// rejection is visible to subscribers as an error snapshot and
    /// returned to the caller as a typed error.
    fn reject(&self, message: &str) -> SessionError {
        warn!(
            session_token = %self.session.token(),
            state = ?self.session.state(),
            message,
            "Rejected session command"
        );
        self.publish(SessionMessage::Error(message.to_string()));
        SessionError::InvalidState(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{OptionRecord, QuestionRecord, QuizRecord};
    use crate::stores::{MemoryContentStore, Role};

    fn identity(id: i64, name: &str) -> Identity {
        Identity {
            id,
            username: name.to_string(),
            role: Role::User,
        }
    }

    fn quiz_record(questions: usize) -> QuizRecord {
        QuizRecord {
            id: 1,
            title: "Capitals".to_string(),
            description: "Geography".to_string(),
            thumbnail: "capitals.png".to_string(),
            timer: 20,
            owner: "alice".to_string(),
            questions: (0..questions as i64)
                .map(|q| QuestionRecord {
                    id: 10 + q,
                    question: format!("q{q}"),
                    options: vec![
                        OptionRecord {
                            id: 100 + q * 10,
                            text: "right".to_string(),
                            correct: true,
                        },
                        OptionRecord {
                            id: 101 + q * 10,
                            text: "wrong".to_string(),
                            correct: false,
                        },
                    ],
                })
                .collect(),
        }
    }

    fn spawn_actor(
        questions: usize,
    ) -> (mpsc::Sender<SessionCommand>, watch::Sender<bool>) {
        let content = Arc::new(MemoryContentStore::new());
        content.insert(quiz_record(questions));
        let record = quiz_record(questions);
        let session = Session::new(
            "AB1CD".to_string(),
            identity(1, "alice"),
            QuizSnapshot::from_record(record),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (tx, _task) = SessionActor::spawn(session, content, shutdown_rx);
        (tx, shutdown_tx)
    }

    async fn join(tx: &mpsc::Sender<SessionCommand>, who: Identity) -> Result<SessionBroadcast, SessionError> {
        let (reply, rx) = oneshot::channel();
        tx.send(SessionCommand::Join { identity: who, reply })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    async fn start(tx: &mpsc::Sender<SessionCommand>, who: Identity) -> Result<SessionBroadcast, SessionError> {
        let (reply, rx) = oneshot::channel();
        tx.send(SessionCommand::Start { identity: who, reply })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    async fn leave(
        tx: &mpsc::Sender<SessionCommand>,
        who: Identity,
    ) -> Result<LeaveOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        tx.send(SessionCommand::Leave { identity: who, reply })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    async fn game(
        tx: &mpsc::Sender<SessionCommand>,
        who: Identity,
        action: GameAction,
    ) -> Result<GameOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        tx.send(SessionCommand::Game {
            identity: who,
            action,
            reply,
        })
        .await
        .unwrap();
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn start_requires_two_players() {
        let (tx, _shutdown) = spawn_actor(1);

        let err = start(&tx, identity(1, "alice")).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidState(_)));

        join(&tx, identity(2, "bob")).await.unwrap();
        let broadcast = start(&tx, identity(1, "alice")).await.unwrap();
        assert!(broadcast.is_started);
        assert_eq!(broadcast.state, SessionState::Starting);
    }

    #[tokio::test]
    async fn start_rejects_non_leader() {
        let (tx, _shutdown) = spawn_actor(1);
        join(&tx, identity(2, "bob")).await.unwrap();

        let err = start(&tx, identity(2, "bob")).await.unwrap_err();
        assert!(matches!(err, SessionError::NotLeader));
    }

    #[tokio::test]
    async fn join_after_start_is_rejected() {
        let (tx, _shutdown) = spawn_actor(1);
        join(&tx, identity(2, "bob")).await.unwrap();
        start(&tx, identity(1, "alice")).await.unwrap();

        let err = join(&tx, identity(3, "carol")).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidState(_)));
    }

    #[tokio::test]
    async fn any_player_can_finish_the_countdown() {
        let (tx, _shutdown) = spawn_actor(1);
        let alice = identity(1, "alice");
        let bob = identity(2, "bob");
        join(&tx, bob.clone()).await.unwrap();
        start(&tx, alice).await.unwrap();

        let outcome = game(&tx, bob, GameAction::FirstCountDown).await.unwrap();
        assert_eq!(outcome.broadcast.unwrap().state, SessionState::Quiz);
    }

    #[tokio::test]
    async fn all_answers_in_reveal_the_round() {
        let (tx, _shutdown) = spawn_actor(1);
        let alice = identity(1, "alice");
        let bob = identity(2, "bob");
        join(&tx, bob.clone()).await.unwrap();
        start(&tx, alice.clone()).await.unwrap();
        game(&tx, alice.clone(), GameAction::FirstCountDown)
            .await
            .unwrap();

        // First answer: accepted silently.
        let outcome = game(
            &tx,
            alice.clone(),
            GameAction::Answer {
                answer: "right".to_string(),
                answer_id: 100,
            },
        )
        .await
        .unwrap();
        assert!(outcome.broadcast.is_none());

        // Last answer: the round is revealed.
        let outcome = game(
            &tx,
            bob.clone(),
            GameAction::Answer {
                answer: "wrong".to_string(),
                answer_id: 101,
            },
        )
        .await
        .unwrap();
        let broadcast = outcome.broadcast.unwrap();
        // Early reveal stays on the live question.
        assert_eq!(broadcast.state, SessionState::Quiz);
        assert_eq!(broadcast.message, SessionMessage::ShowAnswer);
        assert_eq!(broadcast.last_correct_answers, vec![100]);

        let alice_view = broadcast
            .players
            .iter()
            .find(|p| p.username == "alice")
            .unwrap();
        assert!(alice_view.answers[0].correct);
        assert_eq!(alice_view.amount_of_correct_answers, 1);
        assert!(alice_view.score > 0);

        let bob_view = broadcast
            .players
            .iter()
            .find(|p| p.username == "bob")
            .unwrap();
        assert!(!bob_view.answers[0].correct);
        assert_eq!(bob_view.score, 0);
    }

    #[tokio::test]
    async fn next_on_last_question_ends_and_fills_missing_answers() {
        let (tx, _shutdown) = spawn_actor(1);
        let alice = identity(1, "alice");
        join(&tx, identity(2, "bob")).await.unwrap();
        start(&tx, alice.clone()).await.unwrap();
        game(&tx, alice.clone(), GameAction::FirstCountDown)
            .await
            .unwrap();

        // Nobody answers; the leader times the last question out.
        let outcome = game(&tx, alice, GameAction::Next).await.unwrap();
        let broadcast = outcome.broadcast.unwrap();
        assert_eq!(broadcast.state, SessionState::End);
        for player in &broadcast.players {
            assert_eq!(player.answers.len(), 1);
            assert_eq!(player.answers[0].answer_id, None);
            assert_eq!(player.score, 0);
        }
        assert!(outcome.completed.is_some());
    }

    #[tokio::test]
    async fn game_ends_after_last_question() {
        let (tx, _shutdown) = spawn_actor(2);
        let alice = identity(1, "alice");
        let bob = identity(2, "bob");
        join(&tx, bob.clone()).await.unwrap();
        start(&tx, alice.clone()).await.unwrap();
        game(&tx, alice.clone(), GameAction::FirstCountDown)
            .await
            .unwrap();

        // Question 1: close the round, then advance.
        let outcome = game(&tx, alice.clone(), GameAction::Next).await.unwrap();
        assert_eq!(outcome.broadcast.unwrap().state, SessionState::Score);
        let outcome = game(&tx, alice.clone(), GameAction::Next).await.unwrap();
        assert_eq!(outcome.broadcast.unwrap().state, SessionState::Quiz);
        assert!(outcome.completed.is_none());

        // Question 2 is the last: next ends the game directly.
        let outcome = game(&tx, alice.clone(), GameAction::Next).await.unwrap();
        assert_eq!(outcome.broadcast.unwrap().state, SessionState::End);

        let completed = outcome.completed.unwrap();
        assert_eq!(completed.token, "AB1CD");
        assert_eq!(completed.players.len(), 2);
        assert!(completed
            .players
            .iter()
            .all(|p| p.answers.len() == 2));
    }

    #[tokio::test]
    async fn next_outside_the_game_forces_a_live_question() {
        let (tx, _shutdown) = spawn_actor(1);

        let outcome = game(&tx, identity(1, "alice"), GameAction::Next)
            .await
            .unwrap();
        assert_eq!(outcome.broadcast.unwrap().state, SessionState::Quiz);
        assert!(outcome.completed.is_none());
    }

    #[tokio::test]
    async fn answer_outside_quiz_state_is_rejected() {
        let (tx, _shutdown) = spawn_actor(1);
        let err = game(
            &tx,
            identity(1, "alice"),
            GameAction::Answer {
                answer: "right".to_string(),
                answer_id: 100,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SessionError::InvalidState(_)));
    }

    #[tokio::test]
    async fn subscribers_see_accepted_mutations() {
        let (tx, _shutdown) = spawn_actor(1);

        let (reply, rx) = oneshot::channel();
        tx.send(SessionCommand::Subscribe { reply }).await.unwrap();
        let mut events = rx.await.unwrap();

        join(&tx, identity(2, "bob")).await.unwrap();
        let snapshot = events.recv().await.unwrap();
        assert_eq!(snapshot.message, SessionMessage::Join);
        assert_eq!(snapshot.players.len(), 2);
    }

    #[tokio::test]
    async fn lagging_subscriber_does_not_block_commands() {
        let (tx, _shutdown) = spawn_actor(1);

        let (reply, rx) = oneshot::channel();
        tx.send(SessionCommand::Subscribe { reply }).await.unwrap();
        let mut events = rx.await.unwrap();

        // Overflow the broadcast channel while the subscriber reads
        // nothing; every command must still be accepted.
        let bob = identity(2, "bob");
        for _ in 0..BROADCAST_CAPACITY {
            join(&tx, bob.clone()).await.unwrap();
            leave(&tx, bob.clone()).await.unwrap();
        }
        let broadcast = join(&tx, bob.clone()).await.unwrap();
        assert_eq!(broadcast.players.len(), 2);

        // The stream reports the overflow, then keeps delivering.
        assert!(matches!(
            events.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        assert!(events.recv().await.is_ok());
    }

    #[tokio::test]
    async fn rejections_are_broadcast_as_errors() {
        let (tx, _shutdown) = spawn_actor(1);

        let (reply, rx) = oneshot::channel();
        tx.send(SessionCommand::Subscribe { reply }).await.unwrap();
        let mut events = rx.await.unwrap();

        // Only one player: start must fail and subscribers must see it.
        start(&tx, identity(1, "alice")).await.unwrap_err();
        let snapshot = events.recv().await.unwrap();
        assert!(snapshot.message.is_error());
    }
}
