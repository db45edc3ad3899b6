//! Deferred advance scheduling.
//!
//! At most one advance timer is outstanding at a time; scheduling a new
//! one replaces the old, and `cancel` invalidates whatever is pending.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Scheduler for the single inter-item pause timer.
pub trait AdvanceScheduler: Send + Sync {
    /// Run `callback` after `delay_ms`, replacing any pending timer.
    fn schedule(&self, delay_ms: u64, callback: Box<dyn FnOnce() + Send>);
    /// Invalidate the pending timer, if any.
    fn cancel(&self);
}

/// Thread-backed scheduler used outside tests.
///
/// Each schedule bumps a generation; a sleeping timer only fires its
/// callback when its generation is still current.
#[derive(Default)]
pub struct ThreadScheduler {
    generation: Arc<AtomicU64>,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AdvanceScheduler for ThreadScheduler {
    fn schedule(&self, delay_ms: u64, callback: Box<dyn FnOnce() + Send>) {
        let current = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(delay_ms));
            if generation.load(Ordering::SeqCst) == current {
                callback();
            }
        });
    }

    fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn scheduled_callback_fires() {
        let scheduler = ThreadScheduler::new();
        let (tx, rx) = mpsc::channel();
        scheduler.schedule(
            1,
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn cancel_suppresses_pending_callback() {
        let scheduler = ThreadScheduler::new();
        let (tx, rx) = mpsc::channel();
        scheduler.schedule(
            20,
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        scheduler.cancel();
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn rescheduling_replaces_pending_callback() {
        let scheduler = ThreadScheduler::new();
        let (old_tx, old_rx) = mpsc::channel();
        let (new_tx, new_rx) = mpsc::channel();
        scheduler.schedule(
            20,
            Box::new(move || {
                let _ = old_tx.send(());
            }),
        );
        scheduler.schedule(
            1,
            Box::new(move || {
                let _ = new_tx.send(());
            }),
        );
        assert!(new_rx.recv_timeout(Duration::from_secs(2)).is_ok());
        assert!(old_rx.recv_timeout(Duration::from_millis(200)).is_err());
    }
}
