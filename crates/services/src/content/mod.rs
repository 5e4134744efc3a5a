//! Boundary with the remote content-generation service.

mod adapter;
mod http;

use async_trait::async_trait;
use study_core::model::{Level, Question, QuestionCount, SessionSource};

use crate::error::ContentError;

pub use http::HttpContentClient;

/// One generation request, in either of the two supported modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    /// Explain a topic at a level and quiz on it.
    Topic { topic: String, level: Level },
    /// Build a quiz from pasted study content.
    Content {
        content: String,
        num_questions: QuestionCount,
    },
}

impl GenerationRequest {
    #[must_use]
    pub fn topic(topic: impl Into<String>, level: Level) -> Self {
        Self::Topic {
            topic: topic.into(),
            level,
        }
    }

    #[must_use]
    pub fn content(content: impl Into<String>, num_questions: QuestionCount) -> Self {
        Self::Content {
            content: content.into(),
            num_questions,
        }
    }

    /// Trim the input text, rejecting blank input with a user-facing message.
    ///
    /// # Errors
    ///
    /// Returns the validation message when the topic or content is blank.
    pub fn normalized(self) -> Result<Self, String> {
        match self {
            Self::Topic { topic, level } => {
                let topic = topic.trim();
                if topic.is_empty() {
                    return Err("Please enter a topic to learn about".to_owned());
                }
                Ok(Self::Topic {
                    topic: topic.to_owned(),
                    level,
                })
            }
            Self::Content {
                content,
                num_questions,
            } => {
                let content = content.trim();
                if content.is_empty() {
                    return Err("Please enter some study content".to_owned());
                }
                Ok(Self::Content {
                    content: content.to_owned(),
                    num_questions,
                })
            }
        }
    }

    #[must_use]
    pub fn source(&self) -> SessionSource {
        match self {
            Self::Topic { topic, level } => SessionSource::Topic {
                topic: topic.clone(),
                level: *level,
            },
            Self::Content {
                content,
                num_questions,
            } => SessionSource::Content {
                content: content.clone(),
                num_questions: *num_questions,
            },
        }
    }
}

/// Normalized generation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuiz {
    /// Present in topic mode only.
    pub explanation: Option<String>,
    pub questions: Vec<Question>,
}

/// Contract for the content-generation collaborator.
///
/// Calls are single-shot: no retries, no backoff. Timeouts are up to the
/// implementation.
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// Explanation plus quiz for `topic`.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` if the request fails or the response is unusable.
    async fn explain_topic(&self, topic: &str, level: Level)
    -> Result<GeneratedQuiz, ContentError>;

    /// Quiz (no explanation) built from `content`.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` if the request fails or the response is unusable.
    async fn generate_from_content(
        &self,
        content: &str,
        num_questions: QuestionCount,
    ) -> Result<GeneratedQuiz, ContentError>;

    /// Check the service is reachable.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` when it is not.
    async fn health_check(&self) -> Result<(), ContentError> {
        Ok(())
    }

    /// Dispatch `request` to the matching mode.
    ///
    /// # Errors
    ///
    /// Propagates the error of the selected mode.
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedQuiz, ContentError> {
        match request {
            GenerationRequest::Topic { topic, level } => self.explain_topic(topic, *level).await,
            GenerationRequest::Content {
                content,
                num_questions,
            } => self.generate_from_content(content, *num_questions).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_trims_topic() {
        let request = GenerationRequest::topic("  Photosynthesis \n", Level::Teen)
            .normalized()
            .unwrap();
        assert_eq!(request, GenerationRequest::topic("Photosynthesis", Level::Teen));
    }

    #[test]
    fn normalized_rejects_blank_input() {
        assert!(GenerationRequest::topic("   ", Level::Adult).normalized().is_err());
        assert!(
            GenerationRequest::content("\t\n", QuestionCount::default())
                .normalized()
                .is_err()
        );
    }

    #[test]
    fn source_mirrors_request() {
        let request = GenerationRequest::content("Cells", QuestionCount::new(3).unwrap());
        assert_eq!(
            request.source(),
            SessionSource::Content {
                content: "Cells".into(),
                num_questions: QuestionCount::new(3).unwrap()
            }
        );
    }
}
