//! Current-page tracking for the active document.
//!
//! Lifecycle: `Idle` until a document is restored, `Restoring` while the
//! initial scroll is pending, then `Live` while viewport events drive the
//! current page. Local writes happen on every page change; remote writes go
//! through a [`Debouncer`] and are dropped if their document is no longer
//! active when they fire.

use crate::config::ReaderConfig;
use crate::services::debounce::Debouncer;
use crate::stores::{write_json, LocalStore, PositionStore, ScrollSink, POSITION_KEY};
use crate::sync::lock;
use crate::types::{ReadingPosition, ViewportEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    Idle,
    Restoring { target: usize },
    Live,
}

/// Window during which events caused by our own restore scroll are ignored.
#[derive(Debug, Clone, Copy)]
struct ProgrammaticScroll {
    target: usize,
    until: Instant,
}

pub struct PositionReconciler {
    state: ReconcilerState,
    document_id: Option<String>,
    page_count: usize,
    current_page: usize,
    programmatic: Option<ProgrammaticScroll>,
    dominance_ratio: f64,
    restore_delay: Duration,
    restore_settle: Duration,
    local: Arc<dyn LocalStore>,
    scroll: Arc<dyn ScrollSink>,
    remote: Option<Debouncer<ReadingPosition>>,
    active: Arc<Mutex<Option<String>>>,
}

impl PositionReconciler {
    /// `remote` is the account's position store; pass `None` for a signed-out
    /// session and no remote writes are ever scheduled.
    pub fn new(
        config: &ReaderConfig,
        local: Arc<dyn LocalStore>,
        scroll: Arc<dyn ScrollSink>,
        remote: Option<(String, Arc<dyn PositionStore>)>,
    ) -> Self {
        let active: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let remote = remote.map(|(owner_id, store)| {
            let active = Arc::clone(&active);
            Debouncer::new(config.remote_debounce(), move |position: ReadingPosition| {
                let active = Arc::clone(&active);
                let store = Arc::clone(&store);
                let owner_id = owner_id.clone();
                async move {
                    let still_active =
                        lock(&active).as_deref() == Some(position.document_id.as_str());
                    if !still_active {
                        debug!(
                            "Discarding stale remote write for document {}",
                            position.document_id
                        );
                        return;
                    }

                    if let Err(e) = store.set_last_position(&owner_id, &position).await {
                        warn!("Remote position write failed: {}", e);
                    }
                }
            })
        });

        Self {
            state: ReconcilerState::Idle,
            document_id: None,
            page_count: 0,
            current_page: 0,
            programmatic: None,
            dominance_ratio: config.dominance_ratio,
            restore_delay: config.restore_delay(),
            restore_settle: config.restore_settle(),
            local,
            scroll,
            remote,
            active,
        }
    }

    pub fn state(&self) -> ReconcilerState {
        self.state
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn has_pending_remote_write(&self) -> bool {
        self.remote.as_ref().is_some_and(|r| r.is_pending())
    }

    /// Makes `document_id` the active document and enters `Restoring`.
    /// Any remote write still pending for the previous document is cancelled.
    pub fn begin(&mut self, document_id: &str, page_count: usize, target: usize) {
        self.cancel_remote();
        *lock(&self.active) = Some(document_id.to_string());

        let target = target.min(page_count.saturating_sub(1));
        self.document_id = Some(document_id.to_string());
        self.page_count = page_count;
        self.current_page = target;
        self.programmatic = None;
        self.state = ReconcilerState::Restoring { target };

        debug!(
            "Restoring document {} at page {} of {}",
            document_id, target, page_count
        );
    }

    /// Waits for the pages to mount, issues the single restore scroll and
    /// switches to `Live`.
    pub async fn finish_restore(&mut self) {
        let ReconcilerState::Restoring { target } = self.state else {
            return;
        };

        tokio::time::sleep(self.restore_delay).await;

        self.scroll.scroll_to_page(target);
        self.programmatic = Some(ProgrammaticScroll {
            target,
            until: Instant::now() + self.restore_settle,
        });
        self.state = ReconcilerState::Live;
        self.persist_local();

        debug!("Reconciler live at page {}", target);
    }

    pub async fn restore(&mut self, document_id: &str, page_count: usize, target: usize) {
        self.begin(document_id, page_count, target);
        self.finish_restore().await;
    }

    /// Returns `true` when the event moved the current page.
    pub fn handle_viewport(&mut self, event: ViewportEvent) -> bool {
        if self.state != ReconcilerState::Live {
            return false;
        }
        if !event.is_dominant(self.dominance_ratio) {
            return false;
        }
        if event.page_index >= self.page_count {
            debug!(
                "Ignoring viewport event for page {} (document has {} pages)",
                event.page_index, self.page_count
            );
            return false;
        }

        if let Some(guard) = self.programmatic {
            if Instant::now() >= guard.until {
                self.programmatic = None;
            } else if event.page_index == guard.target {
                self.programmatic = None;
                return false;
            } else {
                debug!(
                    "Ignoring page {} while restore scroll settles",
                    event.page_index
                );
                return false;
            }
        }

        if event.page_index == self.current_page {
            return false;
        }

        self.current_page = event.page_index;
        self.persist_local();
        self.schedule_remote();
        true
    }

    pub async fn flush(&mut self) {
        if let Some(remote) = self.remote.as_mut() {
            remote.flush().await;
        }
    }

    /// Ends the session: pending remote writes are cancelled.
    pub fn close(&mut self) {
        self.cancel_remote();
        *lock(&self.active) = None;
        self.document_id = None;
        self.page_count = 0;
        self.current_page = 0;
        self.programmatic = None;
        self.state = ReconcilerState::Idle;
    }

    fn position(&self) -> Option<ReadingPosition> {
        self.document_id
            .as_ref()
            .map(|id| ReadingPosition::now(id.clone(), self.current_page))
    }

    fn persist_local(&self) {
        let Some(position) = self.position() else {
            return;
        };
        if let Err(e) = write_json(self.local.as_ref(), POSITION_KEY, &position) {
            warn!("Local position write failed: {}", e);
        }
    }

    fn schedule_remote(&mut self) {
        let Some(position) = self.position() else {
            return;
        };
        if let Some(remote) = self.remote.as_mut() {
            remote.push(position);
        }
    }

    fn cancel_remote(&mut self) {
        if let Some(remote) = self.remote.as_mut() {
            remote.cancel();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::stores::{read_json, MemoryLocalStore, MemoryPositionStore};

    #[derive(Default)]
    pub(crate) struct RecordingScroll {
        pub(crate) calls: Mutex<Vec<usize>>,
    }

    impl RecordingScroll {
        pub(crate) fn calls(&self) -> Vec<usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ScrollSink for RecordingScroll {
        fn scroll_to_page(&self, index: usize) {
            self.calls.lock().unwrap().push(index);
        }
    }

    struct Fixture {
        reconciler: PositionReconciler,
        local: Arc<MemoryLocalStore>,
        remote: Arc<MemoryPositionStore>,
        scroll: Arc<RecordingScroll>,
    }

    fn fixture() -> Fixture {
        let local = Arc::new(MemoryLocalStore::new());
        let remote = Arc::new(MemoryPositionStore::new());
        let scroll = Arc::new(RecordingScroll::default());
        let reconciler = PositionReconciler::new(
            &ReaderConfig::default(),
            local.clone(),
            scroll.clone(),
            Some(("reader".to_string(), remote.clone() as Arc<dyn PositionStore>)),
        );
        Fixture {
            reconciler,
            local,
            remote,
            scroll,
        }
    }

    fn view(page: usize) -> ViewportEvent {
        ViewportEvent::new(page, true, 0.9)
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_scrolls_once_and_goes_live() {
        let mut f = fixture();

        f.reconciler.begin("doc", 10, 4);
        assert_eq!(
            f.reconciler.state(),
            ReconcilerState::Restoring { target: 4 }
        );
        assert!(!f.reconciler.handle_viewport(view(1)));

        f.reconciler.finish_restore().await;
        assert_eq!(f.reconciler.state(), ReconcilerState::Live);
        assert_eq!(f.scroll.calls(), vec![4]);
        assert_eq!(f.reconciler.current_page(), 4);

        let saved: ReadingPosition = read_json(f.local.as_ref(), POSITION_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(saved.page_index, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_scroll_events_are_not_user_navigation() {
        let mut f = fixture();
        f.reconciler.restore("doc", 10, 6).await;

        // Pages passed over by the programmatic scroll.
        assert!(!f.reconciler.handle_viewport(view(2)));
        assert!(!f.reconciler.handle_viewport(view(6)));
        assert_eq!(f.reconciler.current_page(), 6);

        assert!(f.reconciler.handle_viewport(view(7)));
        assert_eq!(f.reconciler.current_page(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_expires_after_settle_window() {
        let mut f = fixture();
        f.reconciler.restore("doc", 10, 6).await;

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(f.reconciler.handle_viewport(view(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_scroll_produces_one_remote_write() {
        let mut f = fixture();
        f.reconciler.restore("doc", 10, 1).await;
        f.reconciler.handle_viewport(view(1));

        for page in [2, 3, 4, 5] {
            assert!(f.reconciler.handle_viewport(view(page)));
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert!(f.remote.writes().is_empty());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let writes = f.remote.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].page_index, 5);

        let local: ReadingPosition = read_json(f.local.as_ref(), POSITION_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(local.page_index, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_document_cancels_pending_write() {
        let mut f = fixture();
        f.reconciler.restore("first", 10, 0).await;
        f.reconciler.handle_viewport(view(0));
        f.reconciler.handle_viewport(view(3));
        assert!(f.reconciler.has_pending_remote_write());

        f.reconciler.restore("second", 5, 0).await;
        assert!(!f.reconciler.has_pending_remote_write());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(f
            .remote
            .writes()
            .iter()
            .all(|p| p.document_id != "first"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_for_inactive_document_is_discarded_when_it_fires() {
        let mut f = fixture();
        f.reconciler.restore("first", 10, 0).await;
        f.reconciler.handle_viewport(view(0));
        f.reconciler.handle_viewport(view(3));
        assert!(f.reconciler.has_pending_remote_write());

        // Another document became active without cancelling the timer.
        *lock(&f.reconciler.active) = Some("second".to_string());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!f.reconciler.has_pending_remote_write());
        assert!(f.remote.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_dominant_and_out_of_range_events_ignored() {
        let mut f = fixture();
        f.reconciler.restore("doc", 4, 0).await;
        f.reconciler.handle_viewport(view(0));

        assert!(!f.reconciler.handle_viewport(ViewportEvent::new(2, true, 0.3)));
        assert!(!f.reconciler.handle_viewport(ViewportEvent::new(2, false, 0.9)));
        assert!(!f.reconciler.handle_viewport(view(9)));
        assert_eq!(f.reconciler.current_page(), 0);

        assert!(f
            .reconciler
            .handle_viewport(ViewportEvent::new(2, true, 0.5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistence_failures_keep_memory_state() {
        let mut f = fixture();
        f.local.set_failing(true);
        f.remote.set_failing(true);

        f.reconciler.restore("doc", 10, 0).await;
        f.reconciler.handle_viewport(view(0));
        assert!(f.reconciler.handle_viewport(view(8)));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(f.reconciler.current_page(), 8);
        assert_eq!(f.reconciler.state(), ReconcilerState::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_and_goes_idle() {
        let mut f = fixture();
        f.reconciler.restore("doc", 10, 0).await;
        f.reconciler.handle_viewport(view(0));
        f.reconciler.handle_viewport(view(2));

        f.reconciler.close();
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(f.reconciler.state(), ReconcilerState::Idle);
        assert!(f.remote.writes().is_empty());
        assert!(!f.reconciler.handle_viewport(view(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_writes_immediately() {
        let mut f = fixture();
        f.reconciler.restore("doc", 10, 0).await;
        f.reconciler.handle_viewport(view(0));
        f.reconciler.handle_viewport(view(2));

        f.reconciler.flush().await;
        assert_eq!(f.remote.writes().len(), 1);
        assert_eq!(f.remote.writes()[0].page_index, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signed_out_session_never_writes_remote() {
        let local = Arc::new(MemoryLocalStore::new());
        let scroll = Arc::new(RecordingScroll::default());
        let mut reconciler =
            PositionReconciler::new(&ReaderConfig::default(), local.clone(), scroll, None);

        reconciler.restore("doc", 10, 0).await;
        reconciler.handle_viewport(view(0));
        assert!(reconciler.handle_viewport(view(4)));
        assert!(!reconciler.has_pending_remote_write());
    }
}
