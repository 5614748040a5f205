//! Single "ongoing process" slot of an account.
//!
//! Long-running interactive procedures (joining via QR code) must not run
//! concurrently. [`OngoingProcess::alloc`] hands out an RAII guard; dropping
//! the guard frees the slot. [`OngoingProcess::stop`] asks the current holder
//! to give up at its next safe point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug)]
pub struct OngoingProcess {
    running: AtomicBool,
    stop_tx: watch::Sender<bool>,
}

impl Default for OngoingProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl OngoingProcess {
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            running: AtomicBool::new(false),
            stop_tx,
        }
    }

    /// Claims the slot; `None` if another process holds it.
    pub fn alloc(self: &Arc<Self>) -> Option<OngoingGuard> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.stop_tx.send_replace(false);
        Some(OngoingGuard {
            stop_rx: self.stop_tx.subscribe(),
            process: Arc::clone(self),
        })
    }

    /// Signals cancellation; returns `false` if nothing is running.
    pub fn stop(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.stop_tx.send_replace(true);
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct OngoingGuard {
    process: Arc<OngoingProcess>,
    stop_rx: watch::Receiver<bool>,
}

impl OngoingGuard {
    pub fn is_stopped(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Resolves once [`OngoingProcess::stop`] was called.
    pub async fn stopped(&mut self) {
        // the sender lives in `process`, which this guard keeps alive
        let _ = self.stop_rx.wait_for(|stop| *stop).await;
    }
}

impl Drop for OngoingGuard {
    fn drop(&mut self) {
        self.process.stop_tx.send_replace(false);
        self.process.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_slot_is_exclusive_and_freed_on_drop() {
        let process = Arc::new(OngoingProcess::new());
        let guard = process.alloc().expect("slot free");
        assert!(process.alloc().is_none());
        assert!(process.is_running());

        drop(guard);
        assert!(!process.is_running());
        assert!(process.alloc().is_some());
    }

    #[tokio::test]
    async fn test_stop_wakes_holder() {
        let process = Arc::new(OngoingProcess::new());
        let mut guard = process.alloc().unwrap();
        assert!(!guard.is_stopped());

        assert!(process.stop());
        timeout(Duration::from_secs(1), guard.stopped())
            .await
            .expect("stop observed");
        assert!(guard.is_stopped());
    }

    #[test]
    fn test_stop_without_process() {
        let process = Arc::new(OngoingProcess::new());
        assert!(!process.stop());

        // a stale stop request does not leak into the next allocation
        let guard = process.alloc().unwrap();
        assert!(!guard.is_stopped());
    }
}
