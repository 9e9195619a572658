//! Shared "the widget is still alive" flag.
//!
//! Every loop polls it once per iteration; loops that park on a channel
//! also await [`Lifeline::stopped`] so shutdown wakes them immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct Lifeline {
    alive: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Lifeline {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Clear the flag and wake everyone waiting in [`stopped`](Self::stopped).
    pub fn kill(&self) {
        self.alive.store(false, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Resolves once [`kill`](Self::kill) has been called.
    pub async fn stopped(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent kill() is not missed
            notified.as_mut().enable();
            if !self.is_alive() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for Lifeline {
    fn default() -> Self {
        Self::new()
    }
}
