//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Failures at the content-generation boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    /// The request never produced a response (connection, timeout, TLS).
    #[error("network error: {0}")]
    Network(String),
    /// The service answered with a failure status or `success: false`.
    #[error("server error: {message}")]
    Server { status: Option<u16>, message: String },
    /// The response could not be turned into a quiz.
    #[error("invalid response: {0}")]
    InvalidPayload(String),
}

impl ContentError {
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidPayload(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Invalid client configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

/// Errors emitted by `SessionController` operations that reach storage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
