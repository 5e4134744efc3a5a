use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use study_core::model::{Session, SessionId};
use thiserror::Error;

use crate::history::HistoryStore;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid record: {0}")]
    Invalid(#[from] study_core::Error),
}

/// Minimal string key/value persistence, the shape of browser-local storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Bounded, newest-first history of past sessions.
///
/// Every mutation persists the full resulting list before returning.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Read persisted history. Missing or unreadable data yields an empty list.
    async fn load(&self) -> Vec<Session>;

    /// Prepend `session`, keeping at most the configured capacity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be encoded or persisted.
    async fn add(&self, session: &Session) -> Result<Vec<Session>, StorageError>;

    /// Remove the entry with `id`; absent ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be persisted.
    async fn remove(&self, id: SessionId) -> Result<Vec<Session>, StorageError>;

    /// Remove every entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the persisted key cannot be removed.
    async fn clear(&self) -> Result<Vec<Session>, StorageError>;

    /// Entries as of the last load or mutation.
    async fn entries(&self) -> Vec<Session>;
}

/// Simple in-memory key/value store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Aggregates the key/value backend and the history built on it for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub kv: Arc<dyn KeyValueStore>,
    pub history: Arc<dyn HistoryRepository>,
}

impl Storage {
    #[must_use]
    pub fn from_kv(kv: Arc<dyn KeyValueStore>) -> Self {
        let history: Arc<dyn HistoryRepository> = Arc::new(HistoryStore::new(Arc::clone(&kv)));
        Self { kv, history }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_kv(Arc::new(InMemoryKeyValueStore::new()))
    }
}
