//! Wire formats of the generation service and their normalization into `Question`s.
//!
//! The service has shipped several option encodings over time:
//! - a keyed object `{"A": "...", "B": "..."}` (document order is kept)
//! - a plain list `["...", "..."]`, keyed `A`, `B`, ... by position
//! - an explicit list `[{"key": "A", "label": "..."}]`
//!
//! Question text may arrive as `question` or `text`. When options come as a
//! plain list, `correct` may name the key or repeat the label.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use study_core::model::{AnswerOption, Level, OptionKey, Question, QuestionCount};

use crate::content::GeneratedQuiz;
use crate::error::ContentError;

pub(crate) const GENERIC_FAILURE: &str = "Failed to generate content. Please try again.";

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
pub(crate) struct ExplainRequest<'a> {
    pub topic: &'a str,
    pub level: Level,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuizRequest<'a> {
    pub study_content: &'a str,
    pub num_questions: QuestionCount,
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    questions: Vec<WireQuestion>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireQuestion {
    #[serde(alias = "text")]
    question: String,
    options: WireOptions,
    correct: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireOptions {
    Pairs(Vec<WireOption>),
    Labels(Vec<String>),
    Keyed(Map<String, Value>),
}

#[derive(Debug, Deserialize)]
struct WireOption {
    key: String,
    label: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Explain,
    Quiz,
}

/// Parse a successful-status body into a quiz.
pub(crate) fn parse_generation(body: &str, mode: Mode) -> Result<GeneratedQuiz, ContentError> {
    let response: GenerationResponse = serde_json::from_str(body)
        .map_err(|e| ContentError::InvalidPayload(e.to_string()))?;

    if !response.success {
        return Err(ContentError::Server {
            status: None,
            message: response
                .error
                .filter(|msg| !msg.trim().is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE.to_owned()),
        });
    }

    let explanation = match mode {
        Mode::Explain => {
            let text = response
                .explanation
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty())
                .ok_or_else(|| ContentError::InvalidPayload("missing explanation".into()))?;
            Some(text)
        }
        Mode::Quiz => None,
    };

    if response.questions.is_empty() {
        return Err(ContentError::InvalidPayload("no questions returned".into()));
    }

    let questions = response
        .questions
        .into_iter()
        .enumerate()
        .map(|(index, wire)| {
            normalize_question(wire)
                .map_err(|msg| ContentError::InvalidPayload(format!("question {}: {msg}", index + 1)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GeneratedQuiz {
        explanation,
        questions,
    })
}

/// The `error` field of a failure body, if there is one.
pub(crate) fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.error)
        .map(|msg| msg.trim().to_owned())
        .filter(|msg| !msg.is_empty())
}

fn normalize_question(wire: WireQuestion) -> Result<Question, String> {
    let options: Vec<AnswerOption> = match wire.options {
        WireOptions::Pairs(pairs) => pairs
            .into_iter()
            .map(|pair| AnswerOption::new(OptionKey::new(pair.key), pair.label))
            .collect(),
        WireOptions::Labels(labels) => labels
            .into_iter()
            .enumerate()
            .map(|(position, label)| AnswerOption::new(OptionKey::from_position(position), label))
            .collect(),
        WireOptions::Keyed(map) => map
            .into_iter()
            .map(|(key, value)| {
                let label = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                AnswerOption::new(OptionKey::new(key), label)
            })
            .collect(),
    };

    let correct = resolve_correct(&options, &wire.correct);
    Question::new(wire.question, options, correct).map_err(|e| e.to_string())
}

/// Match `correct` against keys first, then against labels.
fn resolve_correct(options: &[AnswerOption], correct: &str) -> OptionKey {
    let key = OptionKey::new(correct);
    if options.iter().any(|option| option.key == key) {
        return key;
    }
    let wanted = correct.trim();
    options
        .iter()
        .find(|option| option.label.trim() == wanted)
        .map_or(key, |option| option.key.clone())
}
