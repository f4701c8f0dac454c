//! # Novel Quest Reader Core
//!
//! Word-count pagination and reading-position tracking for a document reader.
//! Positions are kept in two tiers: a per-device local store and a
//! per-account remote store, reconciled when a document is opened.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use novel_quest::stores::{MemoryLocalStore, ScrollSink};
//! use novel_quest::{Collaborators, Document, ReaderConfig, ReadingSession, ViewportEvent};
//! use std::sync::Arc;
//!
//! struct PrintScroll;
//!
//! impl ScrollSink for PrintScroll {
//!     fn scroll_to_page(&self, index: usize) {
//!         println!("scroll to page {}", index + 1);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = ReadingSession::new(
//!         ReaderConfig::default(),
//!         Collaborators {
//!             local: Arc::new(MemoryLocalStore::new()),
//!             scroll: Arc::new(PrintScroll),
//!             account: None,
//!         },
//!     )?;
//!
//!     let document = Document {
//!         id: "moby-dick".to_string(),
//!         name: "Moby Dick".to_string(),
//!         content: "Call me Ishmael. Some years ago...".to_string(),
//!         timestamp: chrono::Utc::now(),
//!     };
//!
//!     let decision = session.open(document, None).await?;
//!     println!("Starting on page {}", decision.page_index + 1);
//!
//!     session.handle_viewport(ViewportEvent::new(0, true, 0.8));
//!     session.close();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod services;
pub mod stores;
mod sync;
pub mod types;

// Re-export main types and services for easier usage
pub use config::{DivergencePolicy, ReaderConfig};
pub use error::{NovelQuestError, Result};
pub use services::{
    resolve_restore_target, Account, Collaborators, ContentFetcher, Debouncer, Library,
    Paginator, PositionReconciler, ReadingSession, ReconcilerState,
};
pub use types::{
    Document, FetchedContent, NewDocument, Page, PaginationStats, ReadingPosition,
    RestoreDecision, RestoreSource, SourceType, ViewportEvent,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
