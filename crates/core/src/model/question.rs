use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question has no options")]
    NoOptions,

    #[error("option key cannot be empty")]
    EmptyKey,

    #[error("duplicate option key: {0}")]
    DuplicateKey(String),

    #[error("correct answer {0} is not one of the option keys")]
    UnknownCorrectKey(String),
}

//
// ─── OPTION KEY ───────────────────────────────────────────────────────────────
//

/// Key identifying one option of a question (e.g. `"A"`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionKey(String);

impl OptionKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key for the option at `position` when the source supplied a plain list
    /// (`0 -> "A"`, `1 -> "B"`, ... `26 -> "AA"`).
    #[must_use]
    pub fn from_position(position: usize) -> Self {
        let mut n = position;
        let mut out = Vec::new();
        loop {
            let rem = u8::try_from(n % 26).unwrap_or(0);
            out.push(char::from(b'A' + rem));
            if n < 26 {
                break;
            }
            n = n / 26 - 1;
        }
        out.reverse();
        Self(out.into_iter().collect())
    }
}

impl fmt::Debug for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OptionKey({})", self.0)
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OptionKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A single `(key, label)` pair shown for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub key: OptionKey,
    pub label: String,
}

impl AnswerOption {
    #[must_use]
    pub fn new(key: impl Into<OptionKey>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// An immutable multiple-choice question.
///
/// Options keep the order they were received in; keys are unique and the
/// correct key always names one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    text: String,
    options: Vec<AnswerOption>,
    correct: OptionKey,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank, there are no options,
    /// a key is empty or repeated, or `correct` is not one of the keys.
    pub fn new(
        text: impl Into<String>,
        options: Vec<AnswerOption>,
        correct: impl Into<OptionKey>,
    ) -> Result<Self, QuestionError> {
        let text = text.into().trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if options.is_empty() {
            return Err(QuestionError::NoOptions);
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if option.key.as_str().is_empty() {
                return Err(QuestionError::EmptyKey);
            }
            if !seen.insert(option.key.as_str()) {
                return Err(QuestionError::DuplicateKey(option.key.to_string()));
            }
        }

        let correct = correct.into();
        if !seen.contains(correct.as_str()) {
            return Err(QuestionError::UnknownCorrectKey(correct.to_string()));
        }

        Ok(Self {
            text,
            options,
            correct,
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn correct(&self) -> &OptionKey {
        &self.correct
    }

    #[must_use]
    pub fn has_option(&self, key: &OptionKey) -> bool {
        self.options.iter().any(|option| &option.key == key)
    }

    #[must_use]
    pub fn option(&self, key: &OptionKey) -> Option<&AnswerOption> {
        self.options.iter().find(|option| &option.key == key)
    }
}

//
// ─── ANSWER SET ───────────────────────────────────────────────────────────────
//

/// Selected option per question index. A missing index means unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSet {
    selected: BTreeMap<usize, OptionKey>,
}

impl AnswerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&OptionKey> {
        self.selected.get(&index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &OptionKey)> {
        self.selected.iter().map(|(index, key)| (*index, key))
    }

    /// Sets or overwrites the answer at `index`.
    pub(crate) fn insert(&mut self, index: usize, key: OptionKey) {
        self.selected.insert(index, key);
    }

    pub(crate) fn clear(&mut self) {
        self.selected.clear();
    }

    /// Unchecked; callers validate against their questions.
    pub(crate) fn from_pairs(pairs: impl IntoIterator<Item = (usize, OptionKey)>) -> Self {
        Self {
            selected: pairs.into_iter().collect(),
        }
    }
}
