use chrono::{DateTime, Utc};

use study_core::model::{Level, Session, SessionId};
use study_core::Score;

/// Presentation-agnostic list item for a history entry.
///
/// No pre-formatted strings: the UI decides how to render dates and scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryListItem {
    pub id: SessionId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Topic sessions only.
    pub level: Option<Level>,
    pub question_count: usize,
    pub score: Option<Score>,
}

impl HistoryListItem {
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        Self {
            id: session.id(),
            title: session.source().title(),
            created_at: session.created_at(),
            level: session.source().level(),
            question_count: session.questions().len(),
            score: session.score(),
        }
    }
}
