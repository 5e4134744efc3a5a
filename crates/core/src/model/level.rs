use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── LEVEL ────────────────────────────────────────────────────────────────────
//

/// Audience level an explanation is written for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Ages 5-12: simple explanations.
    Child,
    /// Ages 13-17: clear but detailed.
    Teen,
    /// 18+: comprehensive explanation.
    #[default]
    Adult,
}

impl Level {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Child => "child",
            Level::Teen => "teen",
            Level::Adult => "adult",
        }
    }

    /// Human-readable label including the age band.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Level::Child => "Child (5-12 years)",
            Level::Teen => "Teen (13-17 years)",
            Level::Adult => "Adult (18+ years)",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown level: {0} (expected child, teen or adult)")]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "child" => Ok(Level::Child),
            "teen" => Ok(Level::Teen),
            "adult" => Ok(Level::Adult),
            other => Err(ParseLevelError(other.to_owned())),
        }
    }
}

//
// ─── QUESTION COUNT ───────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionCountError {
    #[error("unsupported number of questions: {0} (expected 3, 5, 7 or 10)")]
    Unsupported(u32),
}

/// Number of questions requested from study content. Only 3, 5, 7 and 10 are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct QuestionCount(u32);

impl QuestionCount {
    pub const ALLOWED: [u32; 4] = [3, 5, 7, 10];

    /// # Errors
    ///
    /// Returns `QuestionCountError::Unsupported` for any value outside `ALLOWED`.
    pub fn new(value: u32) -> Result<Self, QuestionCountError> {
        if Self::ALLOWED.contains(&value) {
            Ok(Self(value))
        } else {
            Err(QuestionCountError::Unsupported(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for QuestionCount {
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<u32> for QuestionCount {
    type Error = QuestionCountError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QuestionCount> for u32 {
    fn from(value: QuestionCount) -> Self {
        value.0
    }
}

impl fmt::Display for QuestionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
