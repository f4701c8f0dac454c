//! Persistence seams.
//!
//! The remote tier (per-account documents and reading position) is async;
//! the device tier is a synchronous key/value store.

pub mod file;
pub mod memory;

use crate::error::Result;
use crate::types::{Document, NewDocument, ReadingPosition};
use async_trait::async_trait;

pub use file::{FileBackend, FileLocalStore};
pub use memory::{MemoryDocumentStore, MemoryLocalStore, MemoryPositionStore};

/// Local store key holding the device's last [`ReadingPosition`] as JSON.
pub const POSITION_KEY: &str = "reading_position";
/// Local store key holding the last opened [`Document`] as JSON.
pub const LAST_DOCUMENT_KEY: &str = "last_document";

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Newest first.
    async fn list(&self, owner_id: &str) -> Result<Vec<Document>>;

    async fn create(&self, owner_id: &str, document: NewDocument) -> Result<String>;

    async fn delete(&self, owner_id: &str, id: &str) -> Result<()>;

    async fn get(&self, owner_id: &str, id: &str) -> Result<Option<Document>>;
}

#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn last_position(&self, owner_id: &str) -> Result<Option<ReadingPosition>>;

    /// Upsert.
    async fn set_last_position(&self, owner_id: &str, position: &ReadingPosition) -> Result<()>;

    async fn clear_last_position(&self, owner_id: &str) -> Result<()>;
}

pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Presentation-layer hook; no completion is reported back.
pub trait ScrollSink: Send + Sync {
    fn scroll_to_page(&self, index: usize);
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(
    store: &dyn LocalStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub(crate) fn write_json<T: serde::Serialize>(
    store: &dyn LocalStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}
