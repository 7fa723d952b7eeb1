//! Chat and search history persisted into a [`KeyValueStore`].
//!
//! The store may be detached (no storage medium in this context). Reads then return
//! empty sequences and writes do nothing. Backend failures and corrupt stored text are
//! logged and read as empty, so callers never handle storage errors. Read-modify-write
//! paths tell the two apart: corrupt text is replaced, but a failed read never leads to
//! a write over the stored value.

use crate::models::{now, ChatMessage, ExportBundle, SearchHistoryItem};
use crate::storage::KeyValueStore;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

pub const CHAT_HISTORY_KEY: &str = "faq_chat_history";
pub const SEARCH_HISTORY_KEY: &str = "faq_search_history";
pub const SEARCH_HISTORY_LIMIT: usize = 50;

/// The storage medium failed to answer a read. Missing or corrupt text is not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadFailed;

#[derive(Clone)]
pub struct HistoryStore {
    backend: Option<Arc<dyn KeyValueStore>>,
}

impl HistoryStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A store with no storage medium behind it.
    pub fn detached() -> Self {
        Self { backend: None }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    // --- Chat history ---

    /// Overwrites the stored transcript with `messages`.
    pub async fn save_chat_history(&self, messages: &[ChatMessage]) {
        self.save(CHAT_HISTORY_KEY, messages).await;
    }

    pub async fn load_chat_history(&self) -> Vec<ChatMessage> {
        self.load(CHAT_HISTORY_KEY).await
    }

    /// Like [`load_chat_history`](Self::load_chat_history), but `None` when the storage
    /// medium could not be read, so the caller knows not to overwrite it.
    pub async fn try_load_chat_history(&self) -> Option<Vec<ChatMessage>> {
        self.read(CHAT_HISTORY_KEY).await.ok()
    }

    pub async fn clear_chat_history(&self) {
        self.remove(CHAT_HISTORY_KEY).await;
    }

    // --- Search history ---

    pub async fn save_search_history(&self, items: &[SearchHistoryItem]) {
        self.save(SEARCH_HISTORY_KEY, items).await;
    }

    /// Most recent first.
    pub async fn load_search_history(&self) -> Vec<SearchHistoryItem> {
        self.load(SEARCH_HISTORY_KEY).await
    }

    /// Records a search at the front of the history, keeping at most
    /// [`SEARCH_HISTORY_LIMIT`] entries. Unsynchronized read-modify-write: concurrent
    /// adds may drop one of the entries.
    ///
    /// The read is retried once. If the stored history still cannot be read, the item is
    /// not recorded and the stored history is left as it was.
    pub async fn add_search(&self, query: &str, result_count: usize) -> SearchHistoryItem {
        let item = SearchHistoryItem::new(query, result_count);
        let read = match self.read::<SearchHistoryItem>(SEARCH_HISTORY_KEY).await {
            Err(ReadFailed) => self.read(SEARCH_HISTORY_KEY).await,
            read => read,
        };
        let Ok(mut history) = read else {
            log::warn!("Search history unreadable, not recording '{}'", query);
            return item;
        };
        history.truncate(SEARCH_HISTORY_LIMIT - 1);
        history.insert(0, item.clone());
        self.save_search_history(&history).await;
        item
    }

    pub async fn clear_search_history(&self) {
        self.remove(SEARCH_HISTORY_KEY).await;
    }

    pub async fn export(&self) -> ExportBundle {
        ExportBundle {
            chat_history: self.load_chat_history().await,
            search_history: self.load_search_history().await,
            export_date: now(),
        }
    }

    // --- Backend access ---

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.read(key).await.unwrap_or_default()
    }

    /// Missing, detached and corrupt all read as empty; only a backend error is `Err`.
    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, ReadFailed> {
        let Some(backend) = &self.backend else {
            return Ok(Vec::new());
        };
        let stored = match backend.get(key).await {
            Ok(Some(stored)) => stored,
            Ok(None) => return Ok(Vec::new()),
            Err(e) => {
                log::error!("Failed to read '{}' from storage: {:?}", key, e);
                return Err(ReadFailed);
            }
        };
        match serde_json::from_str::<Vec<T>>(&stored) {
            Ok(items) => {
                log::debug!("Loaded {} entries from '{}'", items.len(), key);
                Ok(items)
            }
            Err(e) => {
                log::error!("Error parsing stored '{}': {}", key, e);
                Ok(Vec::new())
            }
        }
    }

    async fn save<T: Serialize>(&self, key: &str, items: &[T]) {
        let Some(backend) = &self.backend else {
            return;
        };
        let serialized = match serde_json::to_string(items) {
            Ok(s) => s,
            Err(e) => {
                log::error!("Failed to serialize '{}': {}", key, e);
                return;
            }
        };
        if let Err(e) = backend.set(key, &serialized).await {
            log::error!("Failed to write '{}' to storage: {:?}", key, e);
        }
    }

    async fn remove(&self, key: &str) {
        let Some(backend) = &self.backend else {
            return;
        };
        if let Err(e) = backend.remove(key).await {
            log::error!("Failed to remove '{}' from storage: {:?}", key, e);
        }
    }
}

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates `<epoch millis>-<9 random base36 chars>`. Unique within a session and
/// practically unique across sessions; not suitable for anything security related.
pub fn generate_id() -> String {
    let mut bits = Uuid::new_v4().as_u128();
    let suffix: String = (0..9)
        .map(|_| {
            let c = ID_ALPHABET[(bits % 36) as usize] as char;
            bits /= 36;
            c
        })
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}
