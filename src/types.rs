use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A text body loaded for reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Payload for creating a document in a store; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Zero-based position in the page sequence
    pub index: usize,
    pub content: String,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingPosition {
    pub document_id: String,
    pub page_index: usize,
    pub timestamp: DateTime<Utc>,
}

impl ReadingPosition {
    pub fn now(document_id: impl Into<String>, page_index: usize) -> Self {
        Self {
            document_id: document_id.into(),
            page_index,
            timestamp: Utc::now(),
        }
    }
}

/// Intersection report from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportEvent {
    pub page_index: usize,
    pub visible: bool,
    pub ratio: f64,
}

impl ViewportEvent {
    pub fn new(page_index: usize, visible: bool, ratio: f64) -> Self {
        Self {
            page_index,
            visible,
            ratio,
        }
    }

    pub fn is_dominant(&self, threshold: f64) -> bool {
        self.visible && self.ratio >= threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestoreSource {
    Explicit,
    Remote,
    Local,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreDecision {
    pub page_index: usize,
    pub source: RestoreSource,
    pub clamped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    LocalFile,
    Pdf,
    Url,
}

/// Text pulled out of an import source, before it becomes a [`Document`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedContent {
    pub name: String,
    pub content: String,
    pub source_type: SourceType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationStats {
    pub total_words: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub avg_words_per_page: f64,
    pub last_page_words: usize,
}
