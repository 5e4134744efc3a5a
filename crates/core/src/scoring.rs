//! Quiz scoring.
//!
//! Everything here is pure: no I/O, no clock, no allocation beyond the returned values.

use serde::{Deserialize, Serialize};

use crate::model::{AnswerSet, OptionKey, Question};

/// Correct answers out of total questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct: u32,
    pub total: u32,
}

impl Score {
    #[must_use]
    pub fn new(correct: u32, total: u32) -> Self {
        Self { correct, total }
    }

    /// Percentage rounded half-up to the nearest integer; `0` when there are no questions.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let correct = u64::from(self.correct);
        let total = u64::from(self.total);
        let pct = (correct * 200 + total) / (total * 2);
        u32::try_from(pct).unwrap_or(u32::MAX)
    }

    /// Feedback tier, compared on the exact ratio so rounding never moves a boundary.
    #[must_use]
    pub fn feedback(&self) -> Feedback {
        if self.total == 0 {
            return Feedback::Poor;
        }
        let scaled = u64::from(self.correct) * 100;
        let total = u64::from(self.total);
        if scaled >= 90 * total {
            Feedback::Excellent
        } else if scaled >= 70 * total {
            Feedback::Good
        } else if scaled >= 50 * total {
            Feedback::NeedsReview
        } else {
            Feedback::Poor
        }
    }

    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.total > 0 && self.correct == self.total
    }
}

/// Display tier derived from the score percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feedback {
    /// 90% and above.
    Excellent,
    /// 70% up to 90%.
    Good,
    /// 50% up to 70%.
    NeedsReview,
    /// Below 50%.
    Poor,
}

impl Feedback {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Feedback::Excellent => "excellent",
            Feedback::Good => "good",
            Feedback::NeedsReview => "needs review",
            Feedback::Poor => "poor",
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Feedback::Excellent => "Excellent! You've mastered this material.",
            Feedback::Good => "Good job! You have a solid understanding of the material.",
            Feedback::NeedsReview => {
                "You're on the right track. Review the questions you missed and try again."
            }
            Feedback::Poor => "Keep studying! Review the material and try the quiz again.",
        }
    }
}

/// Count correct answers.
///
/// An index counts as correct only when it is answered with the question's
/// correct key. Answers at indices past the last question are ignored.
#[must_use]
pub fn score(questions: &[Question], answers: &AnswerSet) -> Score {
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(index, question)| answers.get(*index) == Some(question.correct()))
        .count();
    Score {
        correct: u32::try_from(correct).unwrap_or(u32::MAX),
        total: u32::try_from(questions.len()).unwrap_or(u32::MAX),
    }
}

/// Per-question outcome for reviewing a submitted quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionResult {
    pub index: usize,
    pub selected: Option<OptionKey>,
    pub correct: OptionKey,
    pub is_correct: bool,
}

impl QuestionResult {
    #[must_use]
    pub fn message(&self) -> String {
        if self.is_correct {
            "Correct!".to_owned()
        } else {
            format!("Incorrect. The correct answer is {}.", self.correct)
        }
    }
}

/// Grade every question individually, in question order.
#[must_use]
pub fn grade(questions: &[Question], answers: &AnswerSet) -> Vec<QuestionResult> {
    questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let selected = answers.get(index).cloned();
            let is_correct = selected.as_ref() == Some(question.correct());
            QuestionResult {
                index,
                selected,
                correct: question.correct().clone(),
                is_correct,
            }
        })
        .collect()
}
