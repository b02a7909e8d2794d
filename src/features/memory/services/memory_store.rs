//! Per-user memory documents on disk.
//!
//! Each user owns `{root}/{user_id}/short_term_memory.json` and
//! `{root}/{user_id}/long_term_memory.json`. Documents are read and
//! rewritten wholesale. Every read-modify-write for a user runs under that
//! user's lock, and writes land in a `.tmp` sibling that is renamed into
//! place.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::core::error::{AppError, Result};

pub type Document = Map<String, Value>;

const CONVERSATIONS_KEY: &str = "conversations";
const ACTIVE_URL_KEY: &str = "active_url";
const LAST_UPDATED_KEY: &str = "last_updated";
const REFERENCES_DIR: &str = "references";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    ShortTerm,
    LongTerm,
}

impl MemoryKind {
    fn file_name(self) -> &'static str {
        match self {
            MemoryKind::ShortTerm => "short_term_memory.json",
            MemoryKind::LongTerm => "long_term_memory.json",
        }
    }

    pub fn default_document(self) -> Document {
        let value = match self {
            MemoryKind::ShortTerm => json!({
                "conversations": [],
                "preferences": {},
            }),
            MemoryKind::LongTerm => json!({
                "user_profile": {},
                "preferences": {},
                "long_term_goals": {},
                "last_updated": Utc::now().to_rfc3339(),
            }),
        };
        match value {
            Value::Object(map) => map,
            _ => Document::new(),
        }
    }
}

/// One stored query/response exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub query: String,
    pub response: String,
    pub summary: String,
    pub chat_id: Option<String>,
    pub timestamp: String,
}

pub struct MemoryStore {
    root: PathBuf,
    max_conversations: usize,
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    pub fn new(root: impl Into<PathBuf>, max_conversations: usize) -> Self {
        Self {
            root: root.into(),
            max_conversations: max_conversations.max(1),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn user_dir(&self, user_id: i64) -> PathBuf {
        self.root.join(user_id.to_string())
    }

    /// Per-user reference documents directory
    pub fn references_dir(&self, user_id: i64) -> PathBuf {
        self.user_dir(user_id).join(REFERENCES_DIR)
    }

    fn path(&self, user_id: i64, kind: MemoryKind) -> PathBuf {
        self.user_dir(user_id).join(kind.file_name())
    }

    async fn user_lock(&self, user_id: i64) -> Arc<Mutex<()>> {
        self.locks.lock().await.entry(user_id).or_default().clone()
    }

    /// Load a document, creating the default one on first access
    pub async fn load(&self, user_id: i64, kind: MemoryKind) -> Result<Document> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;
        self.read_or_init(user_id, kind).await
    }

    pub async fn save(&self, user_id: i64, kind: MemoryKind, doc: &Document) -> Result<()> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;
        write_document(&self.path(user_id, kind), doc).await
    }

    pub async fn get(&self, user_id: i64, kind: MemoryKind, key: &str) -> Result<Option<Value>> {
        Ok(self.load(user_id, kind).await?.remove(key))
    }

    pub async fn set(&self, user_id: i64, kind: MemoryKind, key: &str, value: Value) -> Result<()> {
        self.update(user_id, kind, |doc| {
            doc.insert(key.to_string(), value);
        })
        .await
        .map(|_| ())
    }

    /// Read-modify-write under the user's lock; returns the saved document
    pub async fn update<F>(&self, user_id: i64, kind: MemoryKind, f: F) -> Result<Document>
    where
        F: FnOnce(&mut Document),
    {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let mut doc = self.read_or_init(user_id, kind).await?;
        f(&mut doc);
        write_document(&self.path(user_id, kind), &doc).await?;
        Ok(doc)
    }

    /// Merge top-level keys into long-term memory and stamp `last_updated`
    pub async fn merge_long_term(&self, user_id: i64, patch: Document) -> Result<Document> {
        self.update(user_id, MemoryKind::LongTerm, |doc| {
            for (key, value) in patch {
                doc.insert(key, value);
            }
            doc.insert(
                LAST_UPDATED_KEY.to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        })
        .await
    }

    /// Last `limit` conversations, oldest first
    pub async fn recent_conversations(&self, user_id: i64, limit: usize) -> Result<Vec<Value>> {
        let doc = self.load(user_id, MemoryKind::ShortTerm).await?;
        Ok(recent_from(&doc, limit))
    }

    pub async fn append_conversation(&self, user_id: i64, entry: ConversationEntry) -> Result<()> {
        let entry = serde_json::to_value(&entry)
            .map_err(|e| AppError::Internal(format!("Failed to encode conversation: {}", e)))?;
        let cap = self.max_conversations;

        self.update(user_id, MemoryKind::ShortTerm, move |doc| {
            let conversations = doc
                .entry(CONVERSATIONS_KEY)
                .or_insert_with(|| Value::Array(Vec::new()));
            if !conversations.is_array() {
                *conversations = Value::Array(Vec::new());
            }
            if let Value::Array(list) = conversations {
                list.push(entry);
                if list.len() > cap {
                    let excess = list.len() - cap;
                    list.drain(..excess);
                }
            }
        })
        .await
        .map(|_| ())
    }

    pub async fn update_active_url(
        &self,
        user_id: i64,
        url: &str,
        title: Option<&str>,
    ) -> Result<()> {
        let active = json!({
            "url": url,
            "title": title.unwrap_or_default(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        self.set(user_id, MemoryKind::ShortTerm, ACTIVE_URL_KEY, active)
            .await
    }

    /// Reset a document to its default contents
    pub async fn clear(&self, user_id: i64, kind: MemoryKind) -> Result<Document> {
        let doc = kind.default_document();
        self.save(user_id, kind, &doc).await?;
        Ok(doc)
    }

    /// Best-effort removal of everything stored for a user
    pub async fn remove_user(&self, user_id: i64) {
        let lock = self.user_lock(user_id).await;
        {
            let _guard = lock.lock().await;
            let dir = self.user_dir(user_id);
            match fs::remove_dir_all(&dir).await {
                Ok(()) => debug!(user_id, "Removed memory directory"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(user_id, "Failed to remove memory directory: {}", e),
            }
        }
        self.locks.lock().await.remove(&user_id);
    }

    async fn read_or_init(&self, user_id: i64, kind: MemoryKind) -> Result<Document> {
        let path = self.path(user_id, kind);
        match fs::read(&path).await {
            Ok(bytes) => parse_document(&path, &bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let doc = kind.default_document();
                write_document(&path, &doc).await?;
                debug!(user_id, file = kind.file_name(), "Initialised memory document");
                Ok(doc)
            }
            Err(e) => Err(AppError::Internal(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Trailing `limit` entries of the `conversations` array
pub fn recent_from(doc: &Document, limit: usize) -> Vec<Value> {
    match doc.get(CONVERSATIONS_KEY) {
        Some(Value::Array(list)) => {
            let start = list.len().saturating_sub(limit);
            list[start..].to_vec()
        }
        _ => Vec::new(),
    }
}

fn parse_document(path: &Path, bytes: &[u8]) -> Result<Document> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::Internal(format!(
            "Memory document {} is not a JSON object",
            path.display()
        ))),
        Err(e) => Err(AppError::Internal(format!(
            "Memory document {} is corrupted: {}",
            path.display(),
            e
        ))),
    }
}

async fn write_document(path: &Path, doc: &Document) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            AppError::Internal(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    let bytes = serde_json::to_vec_pretty(doc)
        .map_err(|e| AppError::Internal(format!("Failed to encode memory: {}", e)))?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &bytes).await.map_err(|e| {
        AppError::Internal(format!("Failed to write {}: {}", tmp_path.display(), e))
    })?;
    fs::rename(&tmp_path, path).await.map_err(|e| {
        AppError::Internal(format!("Failed to move {} into place: {}", path.display(), e))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(n: usize) -> ConversationEntry {
        ConversationEntry {
            query: format!("q{}", n),
            response: format!("r{}", n),
            summary: format!("s{}", n),
            chat_id: Some("chat".to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_defaults_created_on_first_load() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new(dir.path(), 100);

        let short = store.load(1, MemoryKind::ShortTerm).await.unwrap();
        assert_eq!(short.get("conversations"), Some(&json!([])));
        assert_eq!(short.get("preferences"), Some(&json!({})));

        let long = store.load(1, MemoryKind::LongTerm).await.unwrap();
        assert_eq!(long.get("user_profile"), Some(&json!({})));
        assert!(long.get("last_updated").is_some_and(Value::is_string));

        assert!(dir.path().join("1/short_term_memory.json").exists());
        assert!(dir.path().join("1/long_term_memory.json").exists());
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new(dir.path(), 100);

        store
            .set(2, MemoryKind::LongTerm, "values", json!({"honesty": true}))
            .await
            .unwrap();
        let value = store.get(2, MemoryKind::LongTerm, "values").await.unwrap();
        assert_eq!(value, Some(json!({"honesty": true})));

        assert!(store
            .get(2, MemoryKind::LongTerm, "beliefs")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new(dir.path(), 100);

        store.append_conversation(1, entry(1)).await.unwrap();
        assert_eq!(store.recent_conversations(1, 10).await.unwrap().len(), 1);
        assert!(store.recent_conversations(2, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_conversations_returns_tail_in_order() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new(dir.path(), 100);

        for n in 0..5 {
            store.append_conversation(1, entry(n)).await.unwrap();
        }

        let recent = store.recent_conversations(1, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0]["query"], "q3");
        assert_eq!(recent[1]["query"], "q4");
    }

    #[tokio::test]
    async fn test_conversation_cap_drops_oldest() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new(dir.path(), 3);

        for n in 0..5 {
            store.append_conversation(1, entry(n)).await.unwrap();
        }

        let all = store.recent_conversations(1, 100).await.unwrap();
        let queries: Vec<&str> = all.iter().filter_map(|c| c["query"].as_str()).collect();
        assert_eq!(queries, vec!["q2", "q3", "q4"]);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new(dir.path(), 1000));

        let handles: Vec<_> = (0..25)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move { store.append_conversation(7, entry(n)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.recent_conversations(7, 1000).await.unwrap().len(), 25);
    }

    #[tokio::test]
    async fn test_corrupted_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new(dir.path(), 100);
        std::fs::create_dir_all(dir.path().join("3")).unwrap();
        std::fs::write(dir.path().join("3/short_term_memory.json"), b"{oops").unwrap();

        let err = store.load(3, MemoryKind::ShortTerm).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        // The corrupted file is left for inspection
        let raw = std::fs::read(dir.path().join("3/short_term_memory.json")).unwrap();
        assert_eq!(raw, b"{oops");
    }

    #[tokio::test]
    async fn test_non_object_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new(dir.path(), 100);
        std::fs::create_dir_all(dir.path().join("3")).unwrap();
        std::fs::write(dir.path().join("3/long_term_memory.json"), b"[1,2]").unwrap();

        assert!(store.load(3, MemoryKind::LongTerm).await.is_err());
    }

    #[tokio::test]
    async fn test_merge_long_term_stamps_last_updated() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new(dir.path(), 100);

        let mut patch = Document::new();
        patch.insert("user_profile".to_string(), json!({"name": "Ada"}));
        patch.insert("last_updated".to_string(), json!("1970-01-01T00:00:00Z"));

        let doc = store.merge_long_term(4, patch).await.unwrap();
        assert_eq!(doc["user_profile"], json!({"name": "Ada"}));
        assert_eq!(doc["long_term_goals"], json!({}));
        assert_ne!(doc["last_updated"], json!("1970-01-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_update_active_url_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new(dir.path(), 100);

        store
            .update_active_url(5, "https://example.com", Some("Example"))
            .await
            .unwrap();
        let active = store
            .get(5, MemoryKind::ShortTerm, "active_url")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active["url"], "https://example.com");
        assert_eq!(active["title"], "Example");

        store.clear(5, MemoryKind::ShortTerm).await.unwrap();
        assert!(store
            .get(5, MemoryKind::ShortTerm, "active_url")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_remove_user() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new(dir.path(), 100);
        store.load(6, MemoryKind::ShortTerm).await.unwrap();

        store.remove_user(6).await;
        assert!(!dir.path().join("6").exists());
    }

    #[test]
    fn test_recent_from_tolerates_missing_or_malformed_list() {
        let mut doc = Document::new();
        assert!(recent_from(&doc, 5).is_empty());
        doc.insert("conversations".to_string(), json!("nope"));
        assert!(recent_from(&doc, 5).is_empty());
    }
}
