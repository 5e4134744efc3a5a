use thiserror::Error;

use crate::model::{QuestionCountError, QuestionError, SessionError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    QuestionCount(#[from] QuestionCountError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
