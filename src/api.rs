//! Wire types shared by the server and clients.
//!
//! Inbound commands and outbound snapshots are tagged unions, parsed and
//! validated at the boundary before anything reaches the state machine.
//! A malformed payload fails that single command, never the session.

use serde::{Deserialize, Serialize, Serializer};

use crate::quiz::QuestionSnapshot;

/// Length of a session token.
pub const TOKEN_LEN: usize = 5;

// ============================================================================
// Inbound Commands
// ============================================================================

/// A client command, one variant per operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ClientCommand {
    /// Create a session for a quiz; the caller becomes the leader.
    Create {
        #[serde(rename = "quizId")]
        quiz_id: i64,
        #[serde(rename = "identityToken")]
        identity_token: String,
    },
    /// Join an existing session by token.
    Join {
        token: String,
        #[serde(rename = "identityToken")]
        identity_token: String,
    },
    /// Leader-only, pre-start: swap the quiz or change the timer.
    Settings {
        token: String,
        #[serde(rename = "identityToken")]
        identity_token: String,
        #[serde(rename = "setNewQuiz", default)]
        set_new_quiz: bool,
        #[serde(rename = "quizId")]
        quiz_id: Option<i64>,
        #[serde(rename = "changeTimer", default)]
        change_timer: bool,
        timer: Option<u32>,
    },
    /// Leader-only: arm the game for the first countdown.
    Start {
        token: String,
        #[serde(rename = "identityToken")]
        identity_token: String,
    },
    /// Leave the session; a leaving leader dissolves it.
    Leave {
        token: String,
        #[serde(rename = "identityToken")]
        identity_token: String,
    },
    /// In-game actions.
    Game {
        token: String,
        #[serde(rename = "identityToken")]
        identity_token: String,
        #[serde(flatten)]
        action: GameAction,
    },
}

/// In-game message kinds.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "message", rename_all = "camelCase")]
pub enum GameAction {
    /// The lobby countdown finished; show the first question.
    FirstCountDown,
    /// Leader advances the game.
    Next,
    /// A player answers the active question.
    Answer {
        answer: String,
        #[serde(rename = "answerId")]
        answer_id: i64,
    },
}

// ============================================================================
// Outbound Snapshot
// ============================================================================

/// Session lifecycle states as seen on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// Lobby: players may join, settings may change.
    Waiting,
    /// Start accepted, waiting for the first countdown to finish.
    Starting,
    /// A question is active.
    Quiz,
    /// Between questions: scores shown, answers revealed.
    Score,
    /// Terminal: results are being finalized.
    End,
}

/// The `message` field of a broadcast: what just happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMessage {
    Create,
    Join,
    Update,
    Start,
    Next,
    ShowAnswer,
    End,
    Leave { leader: bool, user: String },
    Error(String),
}

impl std::fmt::Display for SessionMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMessage::Create => write!(f, "create"),
            SessionMessage::Join => write!(f, "join"),
            SessionMessage::Update => write!(f, "update"),
            SessionMessage::Start => write!(f, "start"),
            SessionMessage::Next => write!(f, "next"),
            SessionMessage::ShowAnswer => write!(f, "showAnswer"),
            SessionMessage::End => write!(f, "end"),
            SessionMessage::Leave { leader, user } => {
                write!(f, "leave: leader:{leader}, user:{user}")
            }
            SessionMessage::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

impl Serialize for SessionMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl SessionMessage {
    pub fn is_error(&self) -> bool {
        matches!(self, SessionMessage::Error(_))
    }
}

/// Quiz metadata included in every snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizInfo {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub timer: u32,
    /// Username of the quiz author.
    pub username: String,
}

/// One recorded answer as shown to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    pub answer_id: Option<i64>,
    pub answer: Option<String>,
    pub score: u32,
    pub correct: bool,
}

/// One player as shown to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: i64,
    pub username: String,
    pub answers: Vec<AnswerView>,
    pub score: u32,
    pub amount_of_correct_answers: u32,
}

/// Full session-state payload pushed to all subscribers after each
/// accepted mutation.
///
/// The active question's content is present only while a question is
/// live; future questions are never included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBroadcast {
    pub leader_username: String,
    pub players: Vec<PlayerView>,
    pub message: SessionMessage,
    pub token: String,
    pub is_started: bool,
    pub amount_of_questions: usize,
    pub state: SessionState,
    pub last_correct_answers: Vec<i64>,
    pub quiz: QuizInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_question: Option<QuestionSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_command_parses() {
        let cmd: ClientCommand = serde_json::from_str(
            r#"{"command":"create","quizId":4,"identityToken":"tok-a"}"#,
        )
        .unwrap();
        match cmd {
            ClientCommand::Create { quiz_id, identity_token } => {
                assert_eq!(quiz_id, 4);
                assert_eq!(identity_token, "tok-a");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn game_answer_parses_with_flattened_action() {
        let cmd: ClientCommand = serde_json::from_str(
            r#"{"command":"game","token":"AB1CD","identityToken":"tok-a",
                "message":"answer","answer":"Oslo","answerId":12}"#,
        )
        .unwrap();
        match cmd {
            ClientCommand::Game { action: GameAction::Answer { answer, answer_id }, .. } => {
                assert_eq!(answer, "Oslo");
                assert_eq!(answer_id, 12);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn settings_flags_default_to_false() {
        let cmd: ClientCommand = serde_json::from_str(
            r#"{"command":"settings","token":"AB1CD","identityToken":"tok-a"}"#,
        )
        .unwrap();
        match cmd {
            ClientCommand::Settings { set_new_quiz, change_timer, .. } => {
                assert!(!set_new_quiz);
                assert!(!change_timer);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn malformed_payload_is_rejected() {
        // Missing required field.
        assert!(serde_json::from_str::<ClientCommand>(r#"{"command":"join","token":"AB1CD"}"#)
            .is_err());
        // Wrong type.
        assert!(serde_json::from_str::<ClientCommand>(
            r#"{"command":"create","quizId":"four","identityToken":"t"}"#
        )
        .is_err());
        // Unknown command.
        assert!(serde_json::from_str::<ClientCommand>(r#"{"command":"dance"}"#).is_err());
    }

    #[test]
    fn message_wire_format() {
        assert_eq!(
            serde_json::to_string(&SessionMessage::ShowAnswer).unwrap(),
            "\"showAnswer\""
        );
        assert_eq!(
            serde_json::to_string(&SessionMessage::Leave {
                leader: true,
                user: "alice".to_string()
            })
            .unwrap(),
            "\"leave: leader:true, user:alice\""
        );
        assert_eq!(
            serde_json::to_string(&SessionMessage::Error("Not enough players".to_string()))
                .unwrap(),
            "\"error: Not enough players\""
        );
    }
}
