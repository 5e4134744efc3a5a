use study_core::model::Session;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

impl SessionProgress {
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        let total = session.questions().len();
        let answered = session.answers().len();
        Self {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            is_complete: session.is_complete(),
        }
    }
}
