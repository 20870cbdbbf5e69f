//! Common test utilities.

use std::sync::Arc;

use axum::Router;

use quizlive::finalize::Finalizer;
use quizlive::quiz::{OptionRecord, QuestionRecord, QuizRecord};
use quizlive::router::CommandRouter;
use quizlive::server::{self, AppState};
use quizlive::session::SessionRegistry;
use quizlive::stores::{
    Identity, MemoryAttemptStore, MemoryContentStore, MemoryProgressionLedger,
    MemoryUserDirectory, Role, StaticCredentialVerifier, UserRecord,
};

/// Everything a test needs to drive games and inspect their side
/// effects.
pub struct TestEngine {
    pub router: CommandRouter,
    pub attempts: Arc<MemoryAttemptStore>,
    pub ledger: Arc<MemoryProgressionLedger>,
    pub content: Arc<MemoryContentStore>,
}

/// Build an engine with three registered users (`alice`, `bob`,
/// `carol`; tokens `tok-<name>`) and one two-question quiz (id 1,
/// owned by alice, correct option ids 100 and 110).
pub fn test_engine() -> TestEngine {
    let verifier = Arc::new(StaticCredentialVerifier::new());
    let users = Arc::new(MemoryUserDirectory::new());
    for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
        verifier.register(
            format!("tok-{name}"),
            Identity {
                id,
                username: name.to_string(),
                role: Role::User,
            },
        );
        users.insert(UserRecord {
            id,
            username: name.to_string(),
        });
    }

    let content = Arc::new(MemoryContentStore::new());
    content.insert(sample_quiz());

    let attempts = Arc::new(MemoryAttemptStore::new());
    let ledger = Arc::new(MemoryProgressionLedger::new(vec![(2, 1000), (3, 2000)]));

    let registry = SessionRegistry::new(content.clone());
    let finalizer = Finalizer::new(content.clone(), users, attempts.clone(), ledger.clone());
    let router = CommandRouter::new(verifier, registry, finalizer);

    TestEngine {
        router,
        attempts,
        ledger,
        content,
    }
}

/// Create a test app over a fresh engine.
pub fn test_app() -> Router {
    let engine = test_engine();
    server::build_app(
        AppState {
            router: engine.router,
        },
        30,
    )
}

pub fn sample_quiz() -> QuizRecord {
    QuizRecord {
        id: 1,
        title: "Capitals".to_string(),
        description: "Capitals of the world".to_string(),
        thumbnail: "capitals.png".to_string(),
        timer: 20,
        owner: "alice".to_string(),
        questions: (0..2)
            .map(|q| QuestionRecord {
                id: 10 + q,
                question: format!("Question {q}"),
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
