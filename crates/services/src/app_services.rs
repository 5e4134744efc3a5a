use std::sync::Arc;

use storage::repository::{HistoryRepository, Storage};

use crate::Clock;
use crate::config::ContentClientConfig;
use crate::content::{ContentClient, HttpContentClient};
use crate::error::AppServicesError;
use crate::sessions::SessionController;

/// Wires storage and the content client into controllers.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    content: Arc<dyn ContentClient>,
    history: Arc<dyn HistoryRepository>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the HTTP content client.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the HTTP
    /// client cannot be built.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: ContentClientConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let content = Arc::new(HttpContentClient::new(config)?);
        Ok(Self::new(clock, content, storage.history))
    }

    /// In-memory history with the given client; nothing is persisted.
    #[must_use]
    pub fn in_memory(clock: Clock, content: Arc<dyn ContentClient>) -> Self {
        Self::new(clock, content, Storage::in_memory().history)
    }

    #[must_use]
    pub fn new(
        clock: Clock,
        content: Arc<dyn ContentClient>,
        history: Arc<dyn HistoryRepository>,
    ) -> Self {
        Self {
            clock,
            content,
            history,
        }
    }

    #[must_use]
    pub fn content(&self) -> Arc<dyn ContentClient> {
        Arc::clone(&self.content)
    }

    #[must_use]
    pub fn history(&self) -> Arc<dyn HistoryRepository> {
        Arc::clone(&self.history)
    }

    /// A controller over this instance's client and history, with history loaded.
    pub async fn controller(&self) -> SessionController {
        SessionController::start(self.clock, self.content(), self.history()).await
    }
}
