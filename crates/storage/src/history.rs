//! Bounded, newest-first quiz history persisted as one JSON array under a single key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use study_core::Score;
use study_core::model::{
    AnswerOption, Level, OptionKey, Question, QuestionCount, Session, SessionId,
    SessionSource,
};
use tokio::sync::Mutex;

use crate::repository::{HistoryRepository, KeyValueStore, StorageError};

/// Key the history array is stored under.
pub const HISTORY_KEY: &str = "quizHistory";

/// Maximum number of sessions kept.
pub const HISTORY_CAPACITY: usize = 10;

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Persisted shape of one history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: SessionId,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_questions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub questions: Vec<QuestionRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub answers: BTreeMap<usize, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    pub options: Vec<OptionRecord>,
    pub correct: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRecord {
    pub key: String,
    pub label: String,
}

impl HistoryRecord {
    /// Study content is stored as a snippet only.
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        let (topic, content, level, num_questions) = match session.source().for_storage() {
            SessionSource::Topic { topic, level } => (Some(topic), None, Some(level), None),
            SessionSource::Content {
                content,
                num_questions,
            } => (None, Some(content), None, Some(num_questions.value())),
        };

        Self {
            id: session.id(),
            date: session.created_at(),
            topic,
            content,
            level,
            num_questions,
            explanation: session.explanation().map(str::to_owned),
            questions: session
                .questions()
                .iter()
                .map(QuestionRecord::from_question)
                .collect(),
            answers: session
                .answers()
                .iter()
                .map(|(index, key)| (index, key.as_str().to_owned()))
                .collect(),
            score: session.score(),
        }
    }

    /// Convert the record back into a domain `Session`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the record names neither a topic
    /// nor content, and `StorageError::Invalid` if a question or answer fails
    /// validation.
    pub fn into_session(self) -> Result<Session, StorageError> {
        let source = match (self.topic, self.content) {
            (Some(topic), _) => SessionSource::Topic {
                topic,
                level: self.level.unwrap_or_default(),
            },
            (None, Some(content)) => SessionSource::Content {
                content,
                num_questions: self
                    .num_questions
                    .and_then(|n| QuestionCount::new(n).ok())
                    .unwrap_or_default(),
            },
            (None, None) => {
                return Err(StorageError::Serialization(
                    "history record has neither topic nor content".into(),
                ));
            }
        };

        let questions = self
            .questions
            .into_iter()
            .map(QuestionRecord::into_question)
            .collect::<Result<Vec<_>, _>>()?;
        let answers = self
            .answers
            .into_iter()
            .map(|(index, key)| (index, OptionKey::new(key)));

        let session = Session::from_persisted(
            self.id,
            self.date,
            source,
            self.explanation,
            questions,
            answers,
        )
        .map_err(study_core::Error::from)?;
        Ok(session)
    }
}

impl QuestionRecord {
    fn from_question(question: &Question) -> Self {
        Self {
            question: question.text().to_owned(),
            options: question
                .options()
                .iter()
                .map(|option| OptionRecord {
                    key: option.key.as_str().to_owned(),
                    label: option.label.clone(),
                })
                .collect(),
            correct: question.correct().as_str().to_owned(),
        }
    }

    fn into_question(self) -> Result<Question, StorageError> {
        let options = self
            .options
            .into_iter()
            .map(|option| AnswerOption::new(OptionKey::new(option.key), option.label))
            .collect();
        let question = Question::new(self.question, options, OptionKey::new(self.correct))
            .map_err(study_core::Error::from)?;
        Ok(question)
    }
}

//
// ─── STORE ─────────────────────────────────────────────────────────────────────
//

/// History store over a `KeyValueStore`.
///
/// Keeps an in-memory copy of the entries, read from the backend on first
/// use if `load` has not run yet. Mutations hold an async lock across the
/// write, so calls on one store are applied one after another. Two stores
/// pointed at the same key do not see each other's writes; the last write
/// wins.
pub struct HistoryStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    capacity: usize,
    cache: Mutex<Cache>,
}

#[derive(Default)]
struct Cache {
    loaded: bool,
    entries: Vec<Session>,
}

impl HistoryStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            key: HISTORY_KEY.to_owned(),
            capacity: HISTORY_CAPACITY,
            cache: Mutex::new(Cache::default()),
        }
    }

    async fn ensure_loaded(&self, cache: &mut Cache) {
        if !cache.loaded {
            cache.entries = self.read_persisted().await;
            cache.loaded = true;
        }
    }

    async fn read_persisted(&self) -> Vec<Session> {
        let raw = match self.kv.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "failed to read quiz history");
                return Vec::new();
            }
        };

        let values: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(err) => {
                tracing::warn!(
                    key = %self.key,
                    error = %err,
                    "discarding unreadable quiz history"
                );
                if let Err(err) = self.kv.remove(&self.key).await {
                    tracing::warn!(key = %self.key, error = %err, "failed to drop unreadable quiz history");
                }
                return Vec::new();
            }
        };

        decode_entries(values, self.capacity)
    }

    async fn persist(&self, entries: &[Session]) -> Result<(), StorageError> {
        let records: Vec<HistoryRecord> = entries.iter().map(HistoryRecord::from_session).collect();
        let raw = serde_json::to_string(&records)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.set(&self.key, &raw).await
    }
}

/// Decode stored values, skipping entries that fail to parse or validate,
/// duplicate ids (first one wins) and anything past `capacity`.
fn decode_entries(values: Vec<serde_json::Value>, capacity: usize) -> Vec<Session> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(values.len().min(capacity));

    for (position, value) in values.into_iter().enumerate() {
        if out.len() == capacity {
            tracing::debug!(capacity, "ignoring history entries beyond capacity");
            break;
        }
        let session = match serde_json::from_value::<HistoryRecord>(value)
            .map_err(|e| StorageError::Serialization(e.to_string()))
            .and_then(HistoryRecord::into_session)
        {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(position, error = %err, "skipping malformed history entry");
                continue;
            }
        };
        if !seen.insert(session.id()) {
            tracing::warn!(id = %session.id(), "skipping duplicate history entry");
            continue;
        }
        out.push(session);
    }

    out
}

#[async_trait]
impl HistoryRepository for HistoryStore {
    async fn load(&self) -> Vec<Session> {
        let mut cache = self.cache.lock().await;
        let entries = self.read_persisted().await;
        tracing::debug!(count = entries.len(), "loaded quiz history");
        cache.entries = entries.clone();
        cache.loaded = true;
        entries
    }

    async fn add(&self, session: &Session) -> Result<Vec<Session>, StorageError> {
        // Round-trip through the record so the cached entry matches what is stored.
        let entry = HistoryRecord::from_session(session).into_session()?;

        let mut cache = self.cache.lock().await;
        self.ensure_loaded(&mut cache).await;
        let mut next = Vec::with_capacity(self.capacity);
        next.push(entry);
        next.extend(
            cache
                .entries
                .iter()
                .filter(|existing| existing.id() != session.id())
                .cloned(),
        );
        next.truncate(self.capacity);

        self.persist(&next).await?;
        cache.entries = next.clone();
        Ok(next)
    }

    async fn remove(&self, id: SessionId) -> Result<Vec<Session>, StorageError> {
        let mut cache = self.cache.lock().await;
        self.ensure_loaded(&mut cache).await;
        if !cache.entries.iter().any(|entry| entry.id() == id) {
            return Ok(cache.entries.clone());
        }
        let next: Vec<Session> = cache
            .entries
            .iter()
            .filter(|e| e.id() != id)
            .cloned()
            .collect();

        self.persist(&next).await?;
        cache.entries = next.clone();
        Ok(next)
    }

    async fn clear(&self) -> Result<Vec<Session>, StorageError> {
        let mut cache = self.cache.lock().await;
        self.kv.remove(&self.key).await?;
        cache.entries.clear();
        cache.loaded = true;
        Ok(Vec::new())
    }

    async fn entries(&self) -> Vec<Session> {
        let mut cache = self.cache.lock().await;
        self.ensure_loaded(&mut cache).await;
        cache.entries.clone()
    }
}
