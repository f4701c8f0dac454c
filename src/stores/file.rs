use super::{DocumentStore, LocalStore, PositionStore};
use crate::error::{NovelQuestError, Result};
use crate::sync::lock;
use crate::types::{Document, NewDocument, ReadingPosition};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Device key/value store persisted as one JSON object.
#[derive(Debug)]
pub struct FileLocalStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileLocalStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| NovelQuestError::Storage {
                reason: format!("Corrupt device store {}: {}", path.display(), e),
            })?
        } else {
            BTreeMap::new()
        };

        debug!("Opened device store at {}", path.display());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

/// Per-account document and position storage on disk.
///
/// Layout: `<root>/<owner>/documents/<id>.json` and `<root>/<owner>/position.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn owner_dir(&self, owner_id: &str) -> Result<PathBuf> {
        let valid = !owner_id.is_empty()
            && owner_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if !valid {
            return Err(NovelQuestError::Storage {
                reason: format!("Invalid owner id: {:?}", owner_id),
            });
        }
        Ok(self.root.join(owner_id))
    }

    fn documents_dir(&self, owner_id: &str) -> Result<PathBuf> {
        Ok(self.owner_dir(owner_id)?.join("documents"))
    }

    fn document_path(&self, owner_id: &str, id: &str) -> Result<PathBuf> {
        if uuid::Uuid::parse_str(id).is_err() {
            return Err(NovelQuestError::DocumentNotFound { id: id.to_string() });
        }
        Ok(self.documents_dir(owner_id)?.join(format!("{}.json", id)))
    }

    fn position_path(&self, owner_id: &str) -> Result<PathBuf> {
        Ok(self.owner_dir(owner_id)?.join("position.json"))
    }

    async fn read_document(path: &Path) -> Result<Document> {
        let raw = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait]
impl DocumentStore for FileBackend {
    async fn list(&self, owner_id: &str) -> Result<Vec<Document>> {
        let dir = self.documents_dir(owner_id)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let paths: Vec<PathBuf> = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::read_document(&path).await {
                Ok(document) => documents.push(document),
                Err(e) => warn!("Skipping unreadable document {}: {}", path.display(), e),
            }
        }

        documents.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(documents)
    }

    async fn create(&self, owner_id: &str, document: NewDocument) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let path = self.document_path(owner_id, &id)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let document = Document {
            id: id.clone(),
            name: document.name,
            content: document.content,
            timestamp: Utc::now(),
        };
        fs::write(&path, serde_json::to_string_pretty(&document)?).await?;

        info!("Stored document '{}' as {}", document.name, id);
        Ok(id)
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<()> {
        let path = self.document_path(owner_id, id)?;
        if !path.exists() {
            return Err(NovelQuestError::DocumentNotFound { id: id.to_string() });
        }
        fs::remove_file(&path).await?;
        Ok(())
    }

    async fn get(&self, owner_id: &str, id: &str) -> Result<Option<Document>> {
        let path = match self.document_path(owner_id, id) {
            Ok(path) => path,
            Err(NovelQuestError::DocumentNotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Self::read_document(&path).await?))
    }
}

#[async_trait]
impl PositionStore for FileBackend {
    async fn last_position(&self, owner_id: &str) -> Result<Option<ReadingPosition>> {
        let path = self.position_path(owner_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn set_last_position(&self, owner_id: &str, position: &ReadingPosition) -> Result<()> {
        let path = self.position_path(owner_id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, serde_json::to_string_pretty(position)?).await?;
        debug!(
            "Saved remote position {}@{}",
            position.document_id, position.page_index
        );
        Ok(())
    }

    async fn clear_last_position(&self, owner_id: &str) -> Result<()> {
        let path = self.position_path(owner_id)?;
        if path.exists() {
            fs::remove_file(&path).await?;
        }
        Ok(())
    }
}
