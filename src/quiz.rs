//! Quiz content types.
//!
//! `QuizRecord` is the canonical shape served by the [`ContentStore`]:
//! it carries correctness flags and a stable option order. `QuizSnapshot`
//! is the per-session copy handed to a live game: correctness is stripped
//! and each question's options are shuffled exactly once, so every session
//! sees its own option order that stays fixed for the whole game.
//!
//! [`ContentStore`]: crate::stores::ContentStore

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

// ============================================================================
// Canonical Records
// ============================================================================

/// A quiz as stored by the content backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    /// Per-question timer in seconds.
    pub timer: u32,
    /// Username of the quiz author.
    pub owner: String,
    pub questions: Vec<QuestionRecord>,
}

/// A question with its canonical (unshuffled) options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: i64,
    pub question: String,
    pub options: Vec<OptionRecord>,
}

/// A single answer option. `correct` never leaves the content store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionRecord {
    pub id: i64,
    pub text: String,
    pub correct: bool,
}

impl QuestionRecord {
    /// Ids of every correct option for this question.
    pub fn correct_option_ids(&self) -> Vec<i64> {
        self.options
            .iter()
            .filter(|o| o.correct)
            .map(|o| o.id)
            .collect()
    }
}

// ============================================================================
// Session Snapshot
// ============================================================================

/// Immutable per-session copy of a quiz.
///
/// Built once when a session is created (or when the leader swaps the quiz
/// before start). Options are shuffled here and never again: reshuffling
/// mid-game would break the option-id correlation of recorded answers.
#[derive(Debug, Clone)]
pub struct QuizSnapshot {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub timer: u32,
    pub owner: String,
    pub questions: Vec<QuestionSnapshot>,
}

/// A question as presented to players: shuffled options, no correctness.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSnapshot {
    pub id: i64,
    pub question: String,
    pub options: Vec<OptionSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSnapshot {
    pub id: i64,
    pub text: String,
}

impl QuizSnapshot {
    /// Build a snapshot from a canonical record, shuffling each question's
    /// options in place.
    pub fn from_record(record: QuizRecord) -> Self {
        let mut rng = rand::thread_rng();
        let questions = record
            .questions
            .into_iter()
            .map(|q| {
                let mut options: Vec<OptionSnapshot> = q
                    .options
                    .into_iter()
                    .map(|o| OptionSnapshot {
                        id: o.id,
                        text: o.text,
                    })
                    .collect();
                options.shuffle(&mut rng);
                QuestionSnapshot {
                    id: q.id,
                    question: q.question,
                    options,
                }
            })
            .collect();

        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            thumbnail: record.thumbnail,
            timer: record.timer,
            owner: record.owner,
            questions,
        }
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn question(&self, index: usize) -> Option<&QuestionSnapshot> {
        self.questions.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_options(count: usize) -> QuizRecord {
        QuizRecord {
            id: 1,
            title: "Capitals".to_string(),
            description: "Geography".to_string(),
            thumbnail: "capitals.png".to_string(),
            timer: 20,
            owner: "alice".to_string(),
            questions: vec![QuestionRecord {
                id: 10,
                question: "Capital of Norway?".to_string(),
                options: (0..count as i64)
                    .map(|i| OptionRecord {
                        id: 100 + i,
                        text: format!("option {i}"),
                        correct: i == 0,
                    })
                    .collect(),
            }],
        }
    }

    #[test]
    fn snapshot_preserves_option_set() {
        let snapshot = QuizSnapshot::from_record(record_with_options(4));
        let mut ids: Vec<i64> = snapshot.questions[0].options.iter().map(|o| o.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![100, 101, 102, 103]);
    }

    #[test]
    fn snapshot_strips_correctness() {
        let snapshot = QuizSnapshot::from_record(record_with_options(3));
        // Only id and text survive; the type system enforces it, this
        // guards the serialized shape.
        let json = serde_json::to_value(&snapshot.questions[0]).unwrap();
        assert!(json["options"][0].get("correct").is_none());
    }

    #[test]
    fn correct_option_ids() {
        let record = record_with_options(4);
        assert_eq!(record.questions[0].correct_option_ids(), vec![100]);
    }

    #[test]
    fn question_lookup_out_of_range() {
        let snapshot = QuizSnapshot::from_record(record_with_options(2));
        assert!(snapshot.question(0).is_some());
        assert!(snapshot.question(1).is_none());
    }
}
