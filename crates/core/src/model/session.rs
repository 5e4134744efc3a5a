use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{AnswerSet, Level, OptionKey, Question, QuestionCount, SessionId};
use crate::scoring::{self, QuestionResult, Score};

/// Maximum characters of study content kept as a history title.
pub const SNIPPET_CHARS: usize = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session is not waiting for generated content")]
    NotLoading,

    #[error("session is not accepting answers")]
    NotReady,

    #[error("session already submitted")]
    AlreadySubmitted,

    #[error("generated quiz has no questions")]
    NoQuestions,

    #[error("question index {index} out of range (quiz has {len} questions)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("option {key} does not exist for question {index}")]
    UnknownOption { index: usize, key: OptionKey },

    #[error("only {answered} of {total} questions answered")]
    Incomplete { answered: usize, total: usize },
}

/// What the session was generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSource {
    /// Topic explained at a level, followed by a quiz.
    Topic { topic: String, level: Level },
    /// Quiz generated from pasted study content (no explanation).
    Content {
        content: String,
        num_questions: QuestionCount,
    },
}

impl SessionSource {
    /// Short title for lists: the topic, or the start of the study content.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            SessionSource::Topic { topic, .. } => topic.clone(),
            SessionSource::Content { content, .. } => snippet(content, SNIPPET_CHARS),
        }
    }

    #[must_use]
    pub fn level(&self) -> Option<Level> {
        match self {
            SessionSource::Topic { level, .. } => Some(*level),
            SessionSource::Content { .. } => None,
        }
    }

    /// Copy suitable for persisting: study content is cut down to a snippet.
    #[must_use]
    pub fn for_storage(&self) -> Self {
        match self {
            SessionSource::Topic { .. } => self.clone(),
            SessionSource::Content {
                content,
                num_questions,
            } => SessionSource::Content {
                content: snippet(content, SNIPPET_CHARS),
                num_questions: *num_questions,
            },
        }
    }
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
#[must_use]
pub fn snippet(text: &str, max_chars: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_owned(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Waiting on generated content.
    Loading,
    /// Questions available; answers may be recorded.
    Ready,
    /// Scored; answers are frozen.
    Submitted,
}

/// One generation-to-scoring cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    source: SessionSource,
    explanation: Option<String>,
    questions: Vec<Question>,
    answers: AnswerSet,
    status: SessionStatus,
    score: Option<Score>,
}

impl Session {
    /// Empty session waiting on content.
    #[must_use]
    pub fn loading(id: SessionId, created_at: DateTime<Utc>, source: SessionSource) -> Self {
        Self {
            id,
            created_at,
            source,
            explanation: None,
            questions: Vec::new(),
            answers: AnswerSet::new(),
            status: SessionStatus::Loading,
            score: None,
        }
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// Sessions whose answers cover every question come back `Submitted` with
    /// their score recomputed; anything else comes back `Ready`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestions` for an empty quiz, and
    /// `IndexOutOfRange` / `UnknownOption` if a stored answer does not fit.
    pub fn from_persisted(
        id: SessionId,
        created_at: DateTime<Utc>,
        source: SessionSource,
        explanation: Option<String>,
        questions: Vec<Question>,
        answers: impl IntoIterator<Item = (usize, OptionKey)>,
    ) -> Result<Self, SessionError> {
        let answers = AnswerSet::from_pairs(answers);
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        for (index, key) in answers.iter() {
            validate_answer(&questions, index, key)?;
        }

        let mut session = Self {
            id,
            created_at,
            source,
            explanation,
            questions,
            answers,
            status: SessionStatus::Ready,
            score: None,
        };
        if session.is_complete() {
            session.score = Some(scoring::score(&session.questions, &session.answers));
            session.status = SessionStatus::Submitted;
        }
        Ok(session)
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn source(&self) -> &SessionSource {
        &self.source
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Score, once submitted.
    #[must_use]
    pub fn score(&self) -> Option<Score> {
        self.score
    }

    /// True when every question has an answer.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.questions.is_empty() && self.answers.len() == self.questions.len()
    }

    /// Fill a loading session with generated content.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotLoading` unless the session is `Loading`,
    /// or `SessionError::NoQuestions` if `questions` is empty.
    pub fn populate(
        &mut self,
        explanation: Option<String>,
        questions: Vec<Question>,
    ) -> Result<(), SessionError> {
        if self.status != SessionStatus::Loading {
            return Err(SessionError::NotLoading);
        }
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        self.explanation = explanation;
        self.questions = questions;
        self.answers.clear();
        self.status = SessionStatus::Ready;
        Ok(())
    }

    /// Set or overwrite the answer for question `index`.
    ///
    /// # Errors
    ///
    /// Returns `NotReady`/`AlreadySubmitted` outside `Ready`, `IndexOutOfRange`
    /// for a bad index and `UnknownOption` for a key the question does not offer.
    pub fn record_answer(&mut self, index: usize, key: OptionKey) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Ready => {}
            SessionStatus::Submitted => return Err(SessionError::AlreadySubmitted),
            SessionStatus::Loading => return Err(SessionError::NotReady),
        }
        validate_answer(&self.questions, index, &key)?;
        self.answers.insert(index, key);
        Ok(())
    }

    /// Score the session and freeze its answers.
    ///
    /// # Errors
    ///
    /// Returns `Incomplete` while any question is unanswered, and
    /// `NotReady`/`AlreadySubmitted` outside `Ready`.
    pub fn submit(&mut self) -> Result<Score, SessionError> {
        match self.status {
            SessionStatus::Ready => {}
            SessionStatus::Submitted => return Err(SessionError::AlreadySubmitted),
            SessionStatus::Loading => return Err(SessionError::NotReady),
        }
        if !self.is_complete() {
            return Err(SessionError::Incomplete {
                answered: self.answers.len(),
                total: self.questions.len(),
            });
        }
        let score = scoring::score(&self.questions, &self.answers);
        self.score = Some(score);
        self.status = SessionStatus::Submitted;
        Ok(score)
    }

    /// Per-question results; empty until submitted.
    #[must_use]
    pub fn results(&self) -> Vec<QuestionResult> {
        if self.status == SessionStatus::Submitted {
            scoring::grade(&self.questions, &self.answers)
        } else {
            Vec::new()
        }
    }

    /// Fresh `Ready` copy with the same content and no answers.
    #[must_use]
    pub fn retake(&self, id: SessionId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at,
            source: self.source.clone(),
            explanation: self.explanation.clone(),
            questions: self.questions.clone(),
            answers: AnswerSet::new(),
            status: SessionStatus::Ready,
            score: None,
        }
    }
}

fn validate_answer(questions: &[Question], index: usize, key: &OptionKey) -> Result<(), SessionError> {
    let question = questions.get(index).ok_or(SessionError::IndexOutOfRange {
        index,
        len: questions.len(),
    })?;
    if !question.has_option(key) {
        return Err(SessionError::UnknownOption {
            index,
            key: key.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerOption;
    use crate::time::fixed_now;

    fn question(text: &str, correct: &str) -> Question {
        Question::new(
            text,
            vec![
                AnswerOption::new("A", "first"),
                AnswerOption::new("B", "second"),
                AnswerOption::new("C", "third"),
            ],
            correct,
        )
        .unwrap()
    }

    fn topic_source() -> SessionSource {
        SessionSource::Topic {
            topic: "Photosynthesis".into(),
            level: Level::Teen,
        }
    }

    fn ready_session() -> Session {
        let mut session = Session::loading(SessionId::new(1), fixed_now(), topic_source());
        session
            .populate(
                Some("Plants turn light into sugar.".into()),
                vec![question("Q1", "A"), question("Q2", "B")],
            )
            .unwrap();
        session
    }

    #[test]
    fn populate_moves_loading_to_ready() {
        let session = ready_session();
        assert_eq!(session.status(), SessionStatus::Ready);
        assert_eq!(session.questions().len(), 2);
        assert!(session.answers().is_empty());
    }

    #[test]
    fn populate_requires_questions() {
        let mut session = Session::loading(SessionId::new(1), fixed_now(), topic_source());
        let err = session.populate(None, Vec::new()).unwrap_err();
        assert_eq!(err, SessionError::NoQuestions);
        assert_eq!(session.status(), SessionStatus::Loading);
    }

    #[test]
    fn record_answer_validates_index_and_key() {
        let mut session = ready_session();
        assert_eq!(
            session.record_answer(2, "A".into()).unwrap_err(),
            SessionError::IndexOutOfRange { index: 2, len: 2 }
        );
        assert_eq!(
            session.record_answer(0, "Z".into()).unwrap_err(),
            SessionError::UnknownOption {
                index: 0,
                key: "Z".into()
            }
        );
        assert!(session.answers().is_empty());
    }

    #[test]
    fn submit_requires_every_answer() {
        let mut session = ready_session();
        session.record_answer(0, "A".into()).unwrap();
        assert_eq!(
            session.submit().unwrap_err(),
            SessionError::Incomplete {
                answered: 1,
                total: 2
            }
        );
        assert_eq!(session.status(), SessionStatus::Ready);
        assert!(session.score().is_none());
    }

    #[test]
    fn submit_scores_and_freezes() {
        let mut session = ready_session();
        session.record_answer(0, "A".into()).unwrap();
        session.record_answer(1, "C".into()).unwrap();
        let score = session.submit().unwrap();
        assert_eq!(score, Score::new(1, 2));
        assert_eq!(session.status(), SessionStatus::Submitted);
        assert_eq!(
            session.record_answer(1, "B".into()).unwrap_err(),
            SessionError::AlreadySubmitted
        );
        assert_eq!(session.results().len(), 2);
    }

    #[test]
    fn retake_clears_answers() {
        let mut session = ready_session();
        session.record_answer(0, "A".into()).unwrap();
        session.record_answer(1, "B".into()).unwrap();
        session.submit().unwrap();

        let retake = session.retake(SessionId::new(2), fixed_now());
        assert_eq!(retake.status(), SessionStatus::Ready);
        assert!(retake.answers().is_empty());
        assert_eq!(retake.questions(), session.questions());
        assert_eq!(retake.explanation(), session.explanation());
        assert!(retake.score().is_none());
    }

    #[test]
    fn from_persisted_restores_submitted_state() {
        let answers = [(0, OptionKey::from("A")), (1, OptionKey::from("A"))];
        let session = Session::from_persisted(
            SessionId::new(9),
            fixed_now(),
            topic_source(),
            None,
            vec![question("Q1", "A"), question("Q2", "B")],
            answers,
        )
        .unwrap();
        assert_eq!(session.status(), SessionStatus::Submitted);
        assert_eq!(session.score(), Some(Score::new(1, 2)));
    }

    #[test]
    fn from_persisted_rejects_foreign_answers() {
        let answers = [(3_usize, OptionKey::from("A"))];
        let err = Session::from_persisted(
            SessionId::new(9),
            fixed_now(),
            topic_source(),
            None,
            vec![question("Q1", "A")],
            answers,
        )
        .unwrap_err();
        assert_eq!(err, SessionError::IndexOutOfRange { index: 3, len: 1 });
    }

    #[test]
    fn content_source_truncates_for_storage() {
        let long = "x".repeat(150);
        let source = SessionSource::Content {
            content: long,
            num_questions: QuestionCount::default(),
        };
        let SessionSource::Content { content, .. } = source.for_storage() else {
            panic!("expected content source");
        };
        assert_eq!(content.chars().count(), SNIPPET_CHARS + 3);
        assert!(content.ends_with("..."));
        assert_eq!(snippet("short", SNIPPET_CHARS), "short");
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        assert_eq!(snippet("héllo wörld", 4), "héll...");
    }
}
