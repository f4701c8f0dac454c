use crate::error::{NovelQuestError, Result};
use crate::stores::{
    read_json, DocumentStore, LocalStore, PositionStore, LAST_DOCUMENT_KEY, POSITION_KEY,
};
use crate::types::{Document, FetchedContent, NewDocument, ReadingPosition};
use std::sync::Arc;
use tracing::{info, warn};

/// A signed-in user's document collection.
#[derive(Clone)]
pub struct Account {
    pub owner_id: String,
    pub documents: Arc<dyn DocumentStore>,
    pub positions: Arc<dyn PositionStore>,
}

pub struct Library {
    account: Account,
    local: Arc<dyn LocalStore>,
}

impl Library {
    pub fn new(account: Account, local: Arc<dyn LocalStore>) -> Self {
        Self { account, local }
    }

    pub async fn list(&self) -> Result<Vec<Document>> {
        self.account.documents.list(&self.account.owner_id).await
    }

    pub async fn import(&self, fetched: FetchedContent) -> Result<Document> {
        let id = self
            .account
            .documents
            .create(
                &self.account.owner_id,
                NewDocument {
                    name: fetched.name,
                    content: fetched.content,
                },
            )
            .await?;

        info!("Imported document {} for {}", id, self.account.owner_id);
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> Result<Document> {
        self.account
            .documents
            .get(&self.account.owner_id, id)
            .await?
            .ok_or_else(|| NovelQuestError::DocumentNotFound { id: id.to_string() })
    }

    /// Deletes the document and forgets any saved position that points at it.
    pub async fn remove(&self, id: &str) -> Result<()> {
        self.account
            .documents
            .delete(&self.account.owner_id, id)
            .await?;
        info!("Removed document {}", id);

        self.forget_local(id);

        match self
            .account
            .positions
            .last_position(&self.account.owner_id)
            .await
        {
            Ok(Some(position)) if position.document_id == id => {
                if let Err(e) = self
                    .account
                    .positions
                    .clear_last_position(&self.account.owner_id)
                    .await
                {
                    warn!("Could not clear remote position for {}: {}", id, e);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Could not read remote position: {}", e),
        }

        Ok(())
    }

    fn forget_local(&self, id: &str) {
        let local = self.local.as_ref();

        match read_json::<ReadingPosition>(local, POSITION_KEY) {
            Ok(Some(position)) if position.document_id == id => {
                if let Err(e) = local.remove(POSITION_KEY) {
                    warn!("Could not clear local position for {}: {}", id, e);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Could not read local position: {}", e),
        }

        match read_json::<Document>(local, LAST_DOCUMENT_KEY) {
            Ok(Some(document)) if document.id == id => {
                if let Err(e) = local.remove(LAST_DOCUMENT_KEY) {
                    warn!("Could not clear remembered document {}: {}", id, e);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Could not read remembered document: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{write_json, MemoryDocumentStore, MemoryLocalStore, MemoryPositionStore};
    use crate::types::SourceType;

    fn fetched(name: &str) -> FetchedContent {
        FetchedContent {
            name: name.to_string(),
            content: "call me ishmael".to_string(),
            source_type: SourceType::LocalFile,
        }
    }

    #[tokio::test]
    async fn test_remove_discards_positions_for_document() {
        let positions = Arc::new(MemoryPositionStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let library = Library::new(
            Account {
                owner_id: "reader".to_string(),
                documents: Arc::new(MemoryDocumentStore::new()),
                positions: positions.clone(),
            },
            local.clone(),
        );

        let kept = library.import(fetched("kept.txt")).await.unwrap();
        let doomed = library.import(fetched("doomed.txt")).await.unwrap();
        assert_eq!(library.list().await.unwrap().len(), 2);

        positions
            .set_last_position("reader", &ReadingPosition::now(&doomed.id, 3))
            .await
            .unwrap();
        write_json(
            local.as_ref(),
            POSITION_KEY,
            &ReadingPosition::now(&doomed.id, 3),
        )
        .unwrap();
        write_json(local.as_ref(), LAST_DOCUMENT_KEY, &doomed).unwrap();

        library.remove(&doomed.id).await.unwrap();

        assert!(positions.last_position("reader").await.unwrap().is_none());
        assert!(local.get(POSITION_KEY).unwrap().is_none());
        assert!(local.get(LAST_DOCUMENT_KEY).unwrap().is_none());
        assert!(matches!(
            library.get(&doomed.id).await,
            Err(NovelQuestError::DocumentNotFound { .. })
        ));
        assert_eq!(library.get(&kept.id).await.unwrap().name, "kept.txt");
    }

    #[tokio::test]
    async fn test_remove_keeps_positions_for_other_documents() {
        let positions = Arc::new(MemoryPositionStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let library = Library::new(
            Account {
                owner_id: "reader".to_string(),
                documents: Arc::new(MemoryDocumentStore::new()),
                positions: positions.clone(),
            },
            local.clone(),
        );

        let kept = library.import(fetched("kept.txt")).await.unwrap();
        let other = library.import(fetched("other.txt")).await.unwrap();
        positions
            .set_last_position("reader", &ReadingPosition::now(&kept.id, 1))
            .await
            .unwrap();

        library.remove(&other.id).await.unwrap();
        assert!(positions.last_position("reader").await.unwrap().is_some());
    }
}
