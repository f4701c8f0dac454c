//! Debounced delayed action.
//!
//! Each `push` replaces the pending value and re-arms the timer, so a burst
//! of pushes results in a single action carrying the last value once the
//! quiet interval has elapsed.

use crate::sync::lock;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type ActionFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
pub type Action<T> = Arc<dyn Fn(T) -> ActionFuture + Send + Sync>;

pub struct Debouncer<T: Send + 'static> {
    quiet: Duration,
    pending: Arc<Mutex<Option<T>>>,
    timer: Option<JoinHandle<()>>,
    action: Action<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F, Fut>(quiet: Duration, action: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let action: Action<T> = Arc::new(move |value: T| Box::pin(action(value)) as ActionFuture);
        Self {
            quiet,
            pending: Arc::new(Mutex::new(None)),
            timer: None,
            action,
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn push(&mut self, value: T) {
        self.abort_timer();
        *lock(&self.pending) = Some(value);

        let pending = Arc::clone(&self.pending);
        let action = Arc::clone(&self.action);
        let quiet = self.quiet;

        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            let value = lock(&pending).take();
            if let Some(value) = value {
                action(value).await;
            }
        }));
    }

    /// Runs the action now with the pending value, if there is one.
    ///
    /// If the timer has already taken the value and its action is running,
    /// waits for that action to finish instead of aborting it.
    pub async fn flush(&mut self) {
        let value = lock(&self.pending).take();
        match value {
            Some(value) => {
                self.abort_timer();
                debug!("Flushing debounced write");
                (self.action)(value).await;
            }
            None => {
                if let Some(timer) = self.timer.take() {
                    if let Err(e) = timer.await {
                        if !e.is_cancelled() {
                            warn!("Debounced action failed: {}", e);
                        }
                    }
                }
            }
        }
    }

    pub fn cancel(&mut self) {
        self.abort_timer();
        if lock(&self.pending).take().is_some() {
            debug!("Cancelled pending debounced write");
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.pending).is_some()
    }

    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl<T: Send + 'static> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.abort_timer();
    }
}
