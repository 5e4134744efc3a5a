use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use study_core::model::{Level, QuestionCount};
use tracing::{debug, warn};

use super::adapter::{self, ExplainRequest, Mode, QuizRequest, GENERIC_FAILURE};
use super::{ContentClient, GeneratedQuiz};
use crate::config::ContentClientConfig;
use crate::error::{ConfigError, ContentError};

/// `ContentClient` talking JSON over HTTP to the generation service.
#[derive(Clone, Debug)]
pub struct HttpContentClient {
    client: Client,
    config: ContentClientConfig,
}

impl HttpContentClient {
    /// # Errors
    ///
    /// Returns `ConfigError::Client` if the HTTP client cannot be built.
    pub fn new(config: ContentClientConfig) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &ContentClientConfig {
        &self.config
    }

    async fn post<T: Serialize + Sync>(
        &self,
        route: &str,
        payload: &T,
        mode: Mode,
    ) -> Result<GeneratedQuiz, ContentError> {
        let url = self.config.endpoint(route);
        debug!(%url, "requesting generation");

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|err| ContentError::from_transport(&err))?;

        let body = read_body(response).await?;
        let quiz = adapter::parse_generation(&body, mode)?;
        debug!(questions = quiz.questions.len(), "generation succeeded");
        Ok(quiz)
    }
}

/// Body text of a success response; a failure status becomes `ContentError::Server`.
async fn read_body(response: Response) -> Result<String, ContentError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| ContentError::from_transport(&err))?;

    if status.is_success() {
        return Ok(body);
    }

    warn!(status = status.as_u16(), "generation service returned failure status");
    Err(ContentError::Server {
        status: Some(status.as_u16()),
        message: adapter::error_message(&body).unwrap_or_else(|| GENERIC_FAILURE.to_owned()),
    })
}

#[async_trait]
impl ContentClient for HttpContentClient {
    async fn explain_topic(
        &self,
        topic: &str,
        level: Level,
    ) -> Result<GeneratedQuiz, ContentError> {
        self.post("explain", &ExplainRequest { topic, level }, Mode::Explain)
            .await
    }

    async fn generate_from_content(
        &self,
        content: &str,
        num_questions: QuestionCount,
    ) -> Result<GeneratedQuiz, ContentError> {
        self.post(
            "generate-quiz",
            &QuizRequest {
                study_content: content,
                num_questions,
            },
            Mode::Quiz,
        )
        .await
    }

    async fn health_check(&self) -> Result<(), ContentError> {
        let response = self
            .client
            .get(self.config.endpoint("health"))
            .send()
            .await
            .map_err(|err| ContentError::from_transport(&err))?;
        read_body(response).await.map(|_| ())
    }
}
