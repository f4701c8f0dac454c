use super::{DocumentStore, LocalStore, PositionStore};
use crate::error::{NovelQuestError, Result};
use crate::sync::lock;
use crate::types::{Document, NewDocument, ReadingPosition};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

fn unavailable(tier: &str) -> NovelQuestError {
    NovelQuestError::Storage {
        reason: format!("{} store unavailable", tier),
    }
}

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Document>> {
        let mut documents = lock(&self.documents)
            .get(owner_id)
            .cloned()
            .unwrap_or_default();
        documents.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(documents)
    }

    async fn create(&self, owner_id: &str, document: NewDocument) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        lock(&self.documents)
            .entry(owner_id.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                name: document.name,
                content: document.content,
                timestamp: Utc::now(),
            });
        Ok(id)
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<()> {
        if let Some(documents) = lock(&self.documents).get_mut(owner_id) {
            documents.retain(|d| d.id != id);
        }
        Ok(())
    }

    async fn get(&self, owner_id: &str, id: &str) -> Result<Option<Document>> {
        Ok(lock(&self.documents)
            .get(owner_id)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }
}

/// Keeps every accepted write so callers can inspect write traffic.
#[derive(Debug, Default)]
pub struct MemoryPositionStore {
    positions: Mutex<HashMap<String, ReadingPosition>>,
    writes: Mutex<Vec<ReadingPosition>>,
    failing: AtomicBool,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<ReadingPosition> {
        lock(&self.writes).clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("Position"));
        }
        Ok(())
    }
}

#[async_trait]
impl PositionStore for MemoryPositionStore {
    async fn last_position(&self, owner_id: &str) -> Result<Option<ReadingPosition>> {
        self.check()?;
        Ok(lock(&self.positions).get(owner_id).cloned())
    }

    async fn set_last_position(&self, owner_id: &str, position: &ReadingPosition) -> Result<()> {
        self.check()?;
        lock(&self.positions).insert(owner_id.to_string(), position.clone());
        lock(&self.writes).push(position.clone());
        Ok(())
    }

    async fn clear_last_position(&self, owner_id: &str) -> Result<()> {
        self.check()?;
        lock(&self.positions).remove(owner_id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("Local"));
        }
        Ok(())
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check()?;
        lock(&self.entries).remove(key);
        Ok(())
    }
}
