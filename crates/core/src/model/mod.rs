mod ids;
mod level;
mod question;
mod session;

pub use ids::{ParseIdError, SessionId};
pub use level::{Level, ParseLevelError, QuestionCount, QuestionCountError};
pub use question::{AnswerOption, AnswerSet, OptionKey, Question, QuestionError};
pub use session::{SNIPPET_CHARS, Session, SessionError, SessionSource, SessionStatus, snippet};
