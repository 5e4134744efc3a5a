use std::sync::Arc;

use storage::repository::HistoryRepository;
use study_core::model::{OptionKey, Session, SessionId, SessionStatus};
use study_core::{QuestionResult, Score};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::progress::SessionProgress;
use super::view::HistoryListItem;
use crate::Clock;
use crate::content::{ContentClient, GeneratedQuiz, GenerationRequest};
use crate::error::{ContentError, ServiceError};

const NETWORK_MESSAGE: &str =
    "Failed to connect to the server. Please check your connection and try again.";
const GENERATION_MESSAGE: &str = "Failed to generate content. Please try again.";

/// Where the controller is in a generate → answer → submit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    Idle,
    Generating,
    Ready,
    Submitted,
}

/// Message shown to the user after a failed action.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    /// Input rejected before any request was made.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Network(String),
    #[error("{0}")]
    Server(String),
}

impl UserError {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg) | Self::Network(msg) | Self::Server(msg) => msg,
        }
    }
}

impl From<&ContentError> for UserError {
    fn from(err: &ContentError) -> Self {
        match err {
            ContentError::Network(_) => Self::Network(NETWORK_MESSAGE.to_owned()),
            ContentError::Server { message, .. } => Self::Server(message.clone()),
            ContentError::InvalidPayload(_) => Self::Server(GENERATION_MESSAGE.to_owned()),
        }
    }
}

/// Handle for one in-flight generation request.
///
/// The response must be handed back with `seq`; a response whose `seq` no
/// longer matches is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    pub seq: u64,
    pub request: GenerationRequest,
}

/// Result of a submit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Not every question is answered, or there is nothing to submit.
    Rejected,
    Submitted(Score),
}

/// Sole owner of the current session and of history mutations.
///
/// Guard violations are ignored rather than raised: the boolean or
/// `SubmitOutcome::Rejected` return says whether anything happened.
pub struct SessionController {
    clock: Clock,
    client: Arc<dyn ContentClient>,
    history: Arc<dyn HistoryRepository>,
    session: Option<Session>,
    error: Option<UserError>,
    generation_seq: u64,
    last_id: Option<SessionId>,
    entries: Vec<Session>,
}

impl SessionController {
    /// Load history and return an `Idle` controller.
    pub async fn start(
        clock: Clock,
        client: Arc<dyn ContentClient>,
        history: Arc<dyn HistoryRepository>,
    ) -> Self {
        let entries = history.load().await;
        let last_id = entries.iter().map(Session::id).max();
        debug!(entries = entries.len(), "history loaded");
        Self {
            clock,
            client,
            history,
            session: None,
            error: None,
            generation_seq: 0,
            last_id,
            entries,
        }
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn state(&self) -> ControllerState {
        match self.session.as_ref().map(Session::status) {
            None => ControllerState::Idle,
            Some(SessionStatus::Loading) => ControllerState::Generating,
            Some(SessionStatus::Ready) => ControllerState::Ready,
            Some(SessionStatus::Submitted) => ControllerState::Submitted,
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&UserError> {
        self.error.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    #[must_use]
    pub fn score(&self) -> Option<Score> {
        self.session.as_ref().and_then(Session::score)
    }

    /// Per-question review once submitted.
    #[must_use]
    pub fn results(&self) -> Vec<QuestionResult> {
        self.session
            .as_ref()
            .map(Session::results)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        match self.state() {
            ControllerState::Ready | ControllerState::Submitted => {
                self.session.as_ref().map(SessionProgress::from_session)
            }
            ControllerState::Idle | ControllerState::Generating => None,
        }
    }

    /// History as of the last load or mutation, newest first.
    #[must_use]
    pub fn history(&self) -> &[Session] {
        &self.entries
    }

    #[must_use]
    pub fn history_items(&self) -> Vec<HistoryListItem> {
        self.entries.iter().map(HistoryListItem::from_session).collect()
    }

    //
    // ─── GENERATION ────────────────────────────────────────────────────────────
    //

    /// Validate `request` and move to `Generating`.
    ///
    /// Returns `None` when nothing should be sent: blank input (a validation
    /// error is set), a request already in flight, or a session still on
    /// screen (call `reset` first).
    pub fn begin_generation(&mut self, request: GenerationRequest) -> Option<GenerationTicket> {
        let state = self.state();
        if state != ControllerState::Idle {
            debug!(?state, "generation request ignored");
            return None;
        }

        let request = match request.normalized() {
            Ok(request) => request,
            Err(message) => {
                self.error = Some(UserError::Validation(message));
                return None;
            }
        };

        self.error = None;
        self.generation_seq += 1;
        let id = self.clock.next_session_id(self.last_id);
        self.last_id = Some(id);
        self.session = Some(Session::loading(id, self.clock.now(), request.source()));

        info!(seq = self.generation_seq, %id, "generation started");
        Some(GenerationTicket {
            seq: self.generation_seq,
            request,
        })
    }

    /// Apply the response for ticket `seq`.
    ///
    /// Returns `false` and changes nothing if the controller has moved on
    /// since the ticket was issued.
    pub fn complete_generation(
        &mut self,
        seq: u64,
        result: Result<GeneratedQuiz, ContentError>,
    ) -> bool {
        if seq != self.generation_seq || self.state() != ControllerState::Generating {
            debug!(seq, current = self.generation_seq, "stale generation response dropped");
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        match result {
            Ok(quiz) => {
                let count = quiz.questions.len();
                if let Err(err) = session.populate(quiz.explanation, quiz.questions) {
                    warn!(error = %err, "generated quiz rejected");
                    self.session = None;
                    self.error = Some(UserError::Server(GENERATION_MESSAGE.to_owned()));
                } else {
                    info!(seq, questions = count, "generation completed");
                }
            }
            Err(err) => {
                warn!(seq, error = %err, "generation failed");
                self.session = None;
                self.error = Some(UserError::from(&err));
            }
        }
        true
    }

    /// `begin_generation`, call the client, then `complete_generation`.
    pub async fn generate(&mut self, request: GenerationRequest) -> ControllerState {
        let Some(ticket) = self.begin_generation(request) else {
            return self.state();
        };
        let client = Arc::clone(&self.client);
        let result = client.generate(&ticket.request).await;
        self.complete_generation(ticket.seq, result);
        self.state()
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Set or overwrite the answer to question `index`.
    ///
    /// Returns `false` outside `Ready` or when the index or key is invalid.
    pub fn record_answer(&mut self, index: usize, key: impl Into<OptionKey>) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        match session.record_answer(index, key.into()) {
            Ok(()) => true,
            Err(err) => {
                debug!(error = %err, "answer ignored");
                false
            }
        }
    }

    /// Score the session and add it to history.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if history cannot be written. The
    /// session is already `Submitted` at that point.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, ServiceError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(SubmitOutcome::Rejected);
        };
        let score = match session.submit() {
            Ok(score) => score,
            Err(err) => {
                debug!(error = %err, "submit rejected");
                return Ok(SubmitOutcome::Rejected);
            }
        };
        info!(
            id = %session.id(),
            correct = score.correct,
            total = score.total,
            "session submitted"
        );

        match self.history.add(session).await {
            Ok(entries) => {
                self.entries = entries;
                Ok(SubmitOutcome::Submitted(score))
            }
            Err(err) => {
                warn!(error = %err, "failed to save session to history");
                Err(err.into())
            }
        }
    }

    /// Drop the current session. An in-flight request is left to finish and
    /// its response is discarded.
    pub fn reset(&mut self) {
        if self.state() == ControllerState::Generating {
            debug!(seq = self.generation_seq, "in-flight generation abandoned");
        }
        self.session = None;
        self.error = None;
    }

    //
    // ─── HISTORY ───────────────────────────────────────────────────────────────
    //

    /// Reopen history entry `id` as a fresh `Ready` session with no answers.
    ///
    /// Returns `false` while generating or when `id` is not in history.
    pub fn load_from_history(&mut self, id: SessionId) -> bool {
        if self.state() == ControllerState::Generating {
            debug!(%id, "history load ignored while generating");
            return false;
        }
        let Some(entry) = self.entries.iter().find(|entry| entry.id() == id) else {
            debug!(%id, "history entry not found");
            return false;
        };

        let new_id = self.clock.next_session_id(self.last_id);
        self.last_id = Some(new_id);
        self.session = Some(entry.retake(new_id, self.clock.now()));
        self.error = None;
        info!(from = %id, id = %new_id, "session reopened from history");
        true
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if history cannot be written.
    pub async fn remove_from_history(&mut self, id: SessionId) -> Result<(), ServiceError> {
        self.entries = self.history.remove(id).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if history cannot be written.
    pub async fn clear_history(&mut self) -> Result<(), ServiceError> {
        self.entries = self.history.clear().await?;
        Ok(())
    }
}
