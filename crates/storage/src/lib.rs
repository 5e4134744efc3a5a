#![forbid(unsafe_code)]

pub mod history;
pub mod repository;
pub mod sqlite;

pub use history::{HISTORY_CAPACITY, HISTORY_KEY, HistoryRecord, HistoryStore};
pub use repository::{
    HistoryRepository, InMemoryKeyValueStore, KeyValueStore, Storage, StorageError,
};
