//! One reader's session: the active document, its pages and the position
//! reconciler, wired to injected persistence collaborators.

use crate::config::ReaderConfig;
use crate::error::Result;
use crate::services::library::Account;
use crate::services::paginator::Paginator;
use crate::services::reconciler::{PositionReconciler, ReconcilerState};
use crate::services::resolver::resolve_restore_target;
use crate::stores::{
    read_json, write_json, LocalStore, ScrollSink, LAST_DOCUMENT_KEY, POSITION_KEY,
};
use crate::types::{Document, Page, ReadingPosition, RestoreDecision, ViewportEvent};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Collaborators {
    pub local: Arc<dyn LocalStore>,
    pub scroll: Arc<dyn ScrollSink>,
    /// `None` for a signed-out session.
    pub account: Option<Account>,
}

pub struct ReadingSession {
    config: ReaderConfig,
    paginator: Paginator,
    local: Arc<dyn LocalStore>,
    account: Option<Account>,
    reconciler: PositionReconciler,
    document: Option<Document>,
    pages: Vec<Page>,
}

impl ReadingSession {
    pub fn new(config: ReaderConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let paginator = Paginator::new(config.page_size)?;

        let remote = collaborators
            .account
            .as_ref()
            .map(|account| (account.owner_id.clone(), Arc::clone(&account.positions)));
        let reconciler = PositionReconciler::new(
            &config,
            Arc::clone(&collaborators.local),
            collaborators.scroll,
            remote,
        );

        Ok(Self {
            config,
            paginator,
            local: collaborators.local,
            account: collaborators.account,
            reconciler,
            document: None,
            pages: Vec::new(),
        })
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn current_page(&self) -> usize {
        self.reconciler.current_page()
    }

    pub fn current_page_content(&self) -> Option<&Page> {
        self.pages.get(self.reconciler.current_page())
    }

    pub fn state(&self) -> ReconcilerState {
        self.reconciler.state()
    }

    pub fn has_pending_remote_write(&self) -> bool {
        self.reconciler.has_pending_remote_write()
    }

    /// Replaces the active document and restores its reading position.
    ///
    /// `explicit_target` wins over any saved position.
    pub async fn open(
        &mut self,
        document: Document,
        explicit_target: Option<usize>,
    ) -> Result<RestoreDecision> {
        self.reconciler.close();

        let pages = self.paginator.paginate(&document.content);
        let (local, remote) = self.saved_positions().await;
        let local = self.discard_if_deleted(local, &document.id, true).await;
        let remote = self.discard_if_deleted(remote, &document.id, false).await;

        let decision = resolve_restore_target(
            &document.id,
            pages.len(),
            explicit_target,
            local.as_ref(),
            remote.as_ref(),
            self.config.divergence_policy,
        );

        if decision.clamped {
            info!(
                "Saved page is past the end of '{}', starting at page {}",
                document.name,
                decision.page_index + 1
            );
        }
        debug!("Restore decision for {}: {:?}", document.id, decision);

        if let Err(e) = write_json(self.local.as_ref(), LAST_DOCUMENT_KEY, &document) {
            warn!("Could not remember document locally: {}", e);
        }

        let document_id = document.id.clone();
        let page_count = pages.len();
        self.document = Some(document);
        self.pages = pages;

        self.reconciler
            .restore(&document_id, page_count, decision.page_index)
            .await;

        Ok(decision)
    }

    /// Reopens whatever was being read last. Returns `None` when there is
    /// nothing to resume.
    pub async fn resume(&mut self) -> Result<Option<RestoreDecision>> {
        if let Some(document) = self.last_remote_document().await {
            return self.open(document, None).await.map(Some);
        }

        match read_json::<Document>(self.local.as_ref(), LAST_DOCUMENT_KEY) {
            Ok(Some(document)) => self.open(document, None).await.map(Some),
            Ok(None) => Ok(None),
            Err(e) => {
                warn!("Could not read remembered document: {}", e);
                Ok(None)
            }
        }
    }

    pub fn handle_viewport(&mut self, event: ViewportEvent) -> bool {
        self.reconciler.handle_viewport(event)
    }

    pub async fn flush(&mut self) {
        self.reconciler.flush().await;
    }

    /// Pending remote writes are cancelled, not flushed.
    pub fn close(&mut self) {
        self.reconciler.close();
        self.document = None;
        self.pages.clear();
    }

    /// Local and remote saved positions; read failures are logged and
    /// reported as absent.
    pub async fn saved_positions(&self) -> (Option<ReadingPosition>, Option<ReadingPosition>) {
        let local = read_json::<ReadingPosition>(self.local.as_ref(), POSITION_KEY)
            .unwrap_or_else(|e| {
                warn!("Could not read local position: {}", e);
                None
            });

        let remote = match &self.account {
            Some(account) => account
                .positions
                .last_position(&account.owner_id)
                .await
                .unwrap_or_else(|e| {
                    warn!("Could not read remote position: {}", e);
                    None
                }),
            None => None,
        };

        (local, remote)
    }

    async fn last_remote_document(&self) -> Option<Document> {
        let account = self.account.as_ref()?;
        let (_, remote) = self.saved_positions().await;
        let position = remote?;

        match account
            .documents
            .get(&account.owner_id, &position.document_id)
            .await
        {
            Ok(Some(document)) => Some(document),
            Ok(None) => {
                self.forget_remote(&position.document_id).await;
                None
            }
            Err(e) => {
                warn!("Could not load document {}: {}", position.document_id, e);
                None
            }
        }
    }

    /// A position for another document is dropped (and erased from its
    /// store) when that document no longer exists in the account's library.
    async fn discard_if_deleted(
        &self,
        position: Option<ReadingPosition>,
        opening_id: &str,
        is_local: bool,
    ) -> Option<ReadingPosition> {
        let position = position?;
        if position.document_id == opening_id {
            return Some(position);
        }
        let Some(account) = &self.account else {
            return Some(position);
        };

        match account
            .documents
            .get(&account.owner_id, &position.document_id)
            .await
        {
            Ok(Some(_)) => Some(position),
            Ok(None) => {
                debug!(
                    "Discarding position for deleted document {}",
                    position.document_id
                );
                if is_local {
                    if let Err(e) = self.local.remove(POSITION_KEY) {
                        warn!("Could not clear local position: {}", e);
                    }
                } else {
                    self.forget_remote(&position.document_id).await;
                }
                None
            }
            Err(e) => {
                warn!(
                    "Could not check document {}: {}",
                    position.document_id, e
                );
                Some(position)
            }
        }
    }

    async fn forget_remote(&self, document_id: &str) {
        let Some(account) = &self.account else {
            return;
        };
        if let Err(e) = account.positions.clear_last_position(&account.owner_id).await {
            warn!("Could not clear remote position for {}: {}", document_id, e);
        }
    }
}
