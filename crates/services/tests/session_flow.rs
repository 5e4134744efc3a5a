use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use services::{
    Clock, ContentClient, ContentError, ControllerState, GeneratedQuiz, GenerationRequest,
    ServiceError, SessionController, SubmitOutcome, UserError,
};
use storage::repository::{HistoryRepository, Storage, StorageError};
use study_core::model::{AnswerOption, Level, Question, QuestionCount, Session, SessionId};
use study_core::time::fixed_now;
use study_core::{Feedback, Score};

type Respond = dyn Fn() -> Result<GeneratedQuiz, ContentError> + Send + Sync;

struct MockClient {
    calls: AtomicUsize,
    respond: Box<Respond>,
}

impl MockClient {
    fn returning(
        respond: impl Fn() -> Result<GeneratedQuiz, ContentError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            respond: Box::new(respond),
        })
    }

    fn photosynthesis() -> Arc<Self> {
        Self::returning(|| {
            Ok(GeneratedQuiz {
                explanation: Some("Plants turn light into sugar.".into()),
                questions: three_questions(),
            })
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentClient for MockClient {
    async fn explain_topic(
        &self,
        _topic: &str,
        _level: Level,
    ) -> Result<GeneratedQuiz, ContentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)()
    }

    async fn generate_from_content(
        &self,
        _content: &str,
        _num_questions: QuestionCount,
    ) -> Result<GeneratedQuiz, ContentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)().map(|quiz| GeneratedQuiz {
            explanation: None,
            ..quiz
        })
    }
}

/// History whose writes always fail.
struct BrokenHistory;

#[async_trait]
impl HistoryRepository for BrokenHistory {
    async fn load(&self) -> Vec<Session> {
        Vec::new()
    }

    async fn add(&self, _session: &Session) -> Result<Vec<Session>, StorageError> {
        Err(StorageError::Connection("disk full".into()))
    }

    async fn remove(&self, _id: SessionId) -> Result<Vec<Session>, StorageError> {
        Err(StorageError::Connection("disk full".into()))
    }

    async fn clear(&self) -> Result<Vec<Session>, StorageError> {
        Err(StorageError::Connection("disk full".into()))
    }

    async fn entries(&self) -> Vec<Session> {
        Vec::new()
    }
}

fn three_questions() -> Vec<Question> {
    let options = || {
        vec![
            AnswerOption::new("A", "Chlorophyll"),
            AnswerOption::new("B", "Glucose"),
            AnswerOption::new("C", "Oxygen"),
        ]
    };
    vec![
        Question::new("Which pigment captures light?", options(), "A").unwrap(),
        Question::new("Which sugar is produced?", options(), "B").unwrap(),
        Question::new("Which gas is released?", options(), "C").unwrap(),
    ]
}

fn topic() -> GenerationRequest {
    GenerationRequest::topic("Photosynthesis", Level::Teen)
}

async fn controller_with(
    client: Arc<MockClient>,
) -> (SessionController, Arc<dyn HistoryRepository>) {
    let history = Storage::in_memory().history;
    let controller =
        SessionController::start(Clock::fixed(fixed_now()), client, Arc::clone(&history)).await;
    (controller, history)
}

fn answer_all(controller: &mut SessionController, keys: &[&str]) {
    for (index, key) in keys.iter().enumerate() {
        assert!(controller.record_answer(index, *key), "answer {index} rejected");
    }
}

#[tokio::test]
async fn topic_session_is_scored_and_saved() {
    let client = MockClient::photosynthesis();
    let (mut controller, history) = controller_with(Arc::clone(&client)).await;

    assert_eq!(controller.generate(topic()).await, ControllerState::Ready);
    let session = controller.session().expect("session");
    assert_eq!(session.explanation(), Some("Plants turn light into sugar."));
    assert_eq!(session.questions().len(), 3);

    answer_all(&mut controller, &["A", "B", "A"]);
    let outcome = controller.submit().await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Submitted(Score::new(2, 3)));
    assert_eq!(controller.state(), ControllerState::Submitted);
    assert_eq!(controller.score().map(|s| s.feedback()), Some(Feedback::NeedsReview));

    let saved = history.entries().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(Some(saved[0].id()), controller.session().map(Session::id));
    assert_eq!(saved[0].source().level(), Some(Level::Teen));
    assert_eq!(controller.history_items()[0].title, "Photosynthesis");

    let results = controller.results();
    assert!(results[0].is_correct && results[1].is_correct);
    assert_eq!(results[2].message(), "Incorrect. The correct answer is C.");
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn content_session_has_no_explanation() {
    let (mut controller, _history) = controller_with(MockClient::photosynthesis()).await;

    let request = GenerationRequest::content(
        "  Chloroplasts hold chlorophyll.  ",
        QuestionCount::new(3).unwrap(),
    );
    assert_eq!(controller.generate(request).await, ControllerState::Ready);

    let session = controller.session().expect("session");
    assert_eq!(session.explanation(), None);
    assert_eq!(session.source().title(), "Chloroplasts hold chlorophyll.");
}

#[tokio::test]
async fn blank_input_sets_validation_error_without_request() {
    let client = MockClient::photosynthesis();
    let (mut controller, _history) = controller_with(Arc::clone(&client)).await;

    assert_eq!(
        controller.generate(GenerationRequest::topic("   ", Level::Adult)).await,
        ControllerState::Idle
    );
    assert!(matches!(controller.error(), Some(UserError::Validation(_))));
    assert_eq!(client.calls(), 0);

    controller.dismiss_error();
    assert!(controller.error().is_none());
}

#[tokio::test]
async fn failed_generation_returns_to_idle_with_message() {
    let client =
        MockClient::returning(|| Err(ContentError::Network("connection refused".into())));
    let (mut controller, _history) = controller_with(Arc::clone(&client)).await;

    assert_eq!(controller.generate(topic()).await, ControllerState::Idle);
    assert!(controller.session().is_none());
    let Some(UserError::Network(message)) = controller.error() else {
        panic!("expected network error, got {:?}", controller.error());
    };
    assert!(message.starts_with("Failed to connect to the server"));
}

#[tokio::test]
async fn retry_after_failure_clears_the_message() {
    let failed_once = AtomicBool::new(false);
    let client = MockClient::returning(move || {
        if failed_once.swap(true, Ordering::SeqCst) {
            Ok(GeneratedQuiz {
                explanation: Some("Second time lucky.".into()),
                questions: three_questions(),
            })
        } else {
            Err(ContentError::InvalidPayload("truncated body".into()))
        }
    });
    let (mut controller, _history) = controller_with(Arc::clone(&client)).await;

    assert_eq!(controller.generate(topic()).await, ControllerState::Idle);
    assert_eq!(
        controller.error().map(UserError::message),
        Some("Failed to generate content. Please try again.")
    );

    assert_eq!(controller.generate(topic()).await, ControllerState::Ready);
    assert!(controller.error().is_none());
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn server_message_reaches_the_user() {
    let client = MockClient::returning(|| {
        Err(ContentError::Server {
            status: Some(503),
            message: "The tutor is busy".into(),
        })
    });
    let (mut controller, _history) = controller_with(client).await;

    controller.generate(topic()).await;
    assert_eq!(controller.error().map(UserError::message), Some("The tutor is busy"));
}

#[tokio::test]
async fn history_keeps_the_ten_newest_sessions() {
    let (mut controller, history) = controller_with(MockClient::photosynthesis()).await;
    let mut ids = Vec::new();

    for _ in 0..12 {
        assert_eq!(controller.generate(topic()).await, ControllerState::Ready);
        ids.push(controller.session().map(Session::id).expect("id"));
        answer_all(&mut controller, &["A", "B", "C"]);
        assert!(matches!(controller.submit().await.unwrap(), SubmitOutcome::Submitted(_)));
        controller.reset();
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    let saved: Vec<SessionId> = history.entries().await.iter().map(Session::id).collect();
    let expected: Vec<SessionId> = ids[2..].iter().rev().copied().collect();
    assert_eq!(saved.len(), 10);
    assert_eq!(saved, expected);
    assert_eq!(
        controller.history().iter().map(Session::id).collect::<Vec<_>>(),
        expected
    );
}

#[tokio::test]
async fn submit_is_rejected_until_every_question_is_answered() {
    let (mut controller, history) = controller_with(MockClient::photosynthesis()).await;
    assert_eq!(controller.submit().await.unwrap(), SubmitOutcome::Rejected);

    controller.generate(topic()).await;
    answer_all(&mut controller, &["A", "B"]);

    assert_eq!(controller.submit().await.unwrap(), SubmitOutcome::Rejected);
    assert_eq!(controller.state(), ControllerState::Ready);
    assert!(history.entries().await.is_empty());

    let progress = controller.progress().expect("progress");
    assert_eq!((progress.answered, progress.remaining), (2, 1));
    assert!(!progress.is_complete);
}

#[tokio::test]
async fn invalid_answers_are_ignored() {
    let (mut controller, _history) = controller_with(MockClient::photosynthesis()).await;
    assert!(!controller.record_answer(0, "A"));

    controller.generate(topic()).await;
    assert!(!controller.record_answer(3, "A"));
    assert!(!controller.record_answer(0, "Z"));
    assert!(controller.session().expect("session").answers().is_empty());

    assert!(controller.record_answer(0, "A"));
    assert!(controller.record_answer(0, "C"));
    assert_eq!(
        controller.session().and_then(|s| s.answers().get(0)).map(|k| k.as_str()),
        Some("C")
    );
}

#[tokio::test]
async fn answers_are_frozen_after_submit() {
    let (mut controller, _history) = controller_with(MockClient::photosynthesis()).await;
    controller.generate(topic()).await;
    answer_all(&mut controller, &["A", "B", "C"]);
    controller.submit().await.unwrap();

    assert!(!controller.record_answer(0, "B"));
    assert_eq!(controller.submit().await.unwrap(), SubmitOutcome::Rejected);
    assert_eq!(controller.score(), Some(Score::new(3, 3)));
}

#[tokio::test]
async fn second_request_is_ignored_while_generating() {
    let client = MockClient::photosynthesis();
    let (mut controller, _history) = controller_with(Arc::clone(&client)).await;

    let first = controller.begin_generation(topic()).expect("ticket");
    assert_eq!(controller.state(), ControllerState::Generating);
    assert!(controller.begin_generation(topic()).is_none());
    assert_eq!(controller.generate(topic()).await, ControllerState::Generating);
    assert_eq!(client.calls(), 0);

    let quiz = client.generate(&first.request).await;
    assert!(controller.complete_generation(first.seq, quiz));
    assert_eq!(controller.state(), ControllerState::Ready);
}

#[tokio::test]
async fn late_response_after_reset_is_discarded() {
    let client = MockClient::photosynthesis();
    let (mut controller, _history) = controller_with(Arc::clone(&client)).await;

    let abandoned = controller.begin_generation(topic()).expect("ticket");
    controller.reset();
    assert_eq!(controller.state(), ControllerState::Idle);

    let late = client.generate(&abandoned.request).await;
    assert!(!controller.complete_generation(abandoned.seq, late));
    assert_eq!(controller.state(), ControllerState::Idle);
    assert!(controller.session().is_none());

    // Also stale once a newer request is in flight.
    let stale = controller.begin_generation(topic()).expect("ticket");
    controller.reset();
    let current = controller.begin_generation(topic()).expect("ticket");
    assert_ne!(stale.seq, current.seq);

    let failure = Err(ContentError::Network("late".into()));
    assert!(!controller.complete_generation(stale.seq, failure));
    assert_eq!(controller.state(), ControllerState::Generating);
    assert!(controller.error().is_none());

    let quiz = client.generate(&current.request).await;
    assert!(controller.complete_generation(current.seq, quiz));
    assert_eq!(controller.state(), ControllerState::Ready);
}

#[tokio::test]
async fn begin_requires_reset_after_a_session() {
    let (mut controller, _history) = controller_with(MockClient::photosynthesis()).await;
    controller.generate(topic()).await;
    assert!(controller.begin_generation(topic()).is_none());
    assert_eq!(controller.state(), ControllerState::Ready);

    controller.reset();
    assert!(controller.begin_generation(topic()).is_some());
}

#[tokio::test]
async fn history_entry_can_be_retaken() {
    let (mut controller, history) = controller_with(MockClient::photosynthesis()).await;
    controller.generate(topic()).await;
    answer_all(&mut controller, &["A", "A", "A"]);
    controller.submit().await.unwrap();
    let original = controller.history()[0].id();

    assert!(controller.load_from_history(original));
    assert_eq!(controller.state(), ControllerState::Ready);
    let session = controller.session().expect("session");
    assert!(session.answers().is_empty());
    assert_ne!(session.id(), original);
    assert_eq!(session.explanation(), Some("Plants turn light into sugar."));

    answer_all(&mut controller, &["A", "B", "C"]);
    controller.submit().await.unwrap();
    let saved = history.entries().await;
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].score(), Some(Score::new(3, 3)));
    assert_eq!(saved[1].score(), Some(Score::new(1, 3)));

    assert!(!controller.load_from_history(SessionId::new(1)));
}

#[tokio::test]
async fn history_cannot_be_loaded_while_generating() {
    let (mut controller, _history) = controller_with(MockClient::photosynthesis()).await;
    controller.generate(topic()).await;
    answer_all(&mut controller, &["A", "B", "C"]);
    controller.submit().await.unwrap();
    let id = controller.history()[0].id();
    controller.reset();

    let _ticket = controller.begin_generation(topic()).expect("ticket");
    assert!(!controller.load_from_history(id));
    assert_eq!(controller.state(), ControllerState::Generating);
}

#[tokio::test]
async fn remove_and_clear_history() {
    let (mut controller, history) = controller_with(MockClient::photosynthesis()).await;
    for _ in 0..3 {
        controller.generate(topic()).await;
        answer_all(&mut controller, &["A", "B", "C"]);
        controller.submit().await.unwrap();
        controller.reset();
    }
    let middle = controller.history()[1].id();

    controller.remove_from_history(middle).await.unwrap();
    assert_eq!(controller.history().len(), 2);
    assert!(controller.history().iter().all(|s| s.id() != middle));

    controller.remove_from_history(middle).await.unwrap();
    assert_eq!(history.entries().await.len(), 2);

    controller.clear_history().await.unwrap();
    assert!(controller.history().is_empty());
    assert!(history.load().await.is_empty());
}

#[tokio::test]
async fn history_is_loaded_at_start() {
    let storage = Storage::in_memory();
    let clock = Clock::fixed(fixed_now());
    let mut first =
        SessionController::start(clock, MockClient::photosynthesis(), Arc::clone(&storage.history))
            .await;
    first.generate(topic()).await;
    answer_all(&mut first, &["A", "B", "C"]);
    first.submit().await.unwrap();
    let saved_id = first.history()[0].id();

    let mut second =
        SessionController::start(clock, MockClient::photosynthesis(), Arc::clone(&storage.history))
            .await;
    assert_eq!(second.history().len(), 1);

    // New ids stay ahead of what history already holds.
    second.generate(topic()).await;
    assert!(second.session().map(Session::id) > Some(saved_id));
}

#[tokio::test]
async fn storage_failure_surfaces_after_scoring() {
    let history: Arc<dyn HistoryRepository> = Arc::new(BrokenHistory);
    let mut controller =
        SessionController::start(Clock::fixed(fixed_now()), MockClient::photosynthesis(), history)
            .await;
    controller.generate(topic()).await;
    answer_all(&mut controller, &["A", "B", "C"]);

    let err = controller.submit().await.unwrap_err();
    assert!(matches!(err, ServiceError::Storage(StorageError::Connection(_))));
    assert_eq!(controller.state(), ControllerState::Submitted);
    assert_eq!(controller.score(), Some(Score::new(3, 3)));
    assert!(controller.history().is_empty());
}
