//! A cloneable handle for stopping or watching the assistant from other tasks.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle for poking the assistant from external code.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone)]
pub struct ChatHandle {
    pub(crate) cancel: Arc<Mutex<CancellationToken>>,
    pub(crate) idle_notify: Arc<tokio::sync::Notify>,
    pub(crate) is_running: Arc<AtomicBool>,
}

impl ChatHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            idle_notify: Arc::new(tokio::sync::Notify::new()),
            is_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Abort the turn in flight, if any. The assistant stops pulling
    /// fragments and returns to idle.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Wait until no turn is running.
    pub async fn wait_for_idle(&self) {
        let notified = self.idle_notify.notified();
        if !self.is_running.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }

    /// Wait until no turn is running, with a timeout.
    /// Returns `true` if idle was reached, `false` on timeout.
    pub async fn wait_for_idle_timeout(&self, timeout: std::time::Duration) -> bool {
        if !self.is_running.load(Ordering::Acquire) {
            return true;
        }
        tokio::time::timeout(timeout, self.wait_for_idle())
            .await
            .is_ok()
    }

    /// Whether a turn is currently running.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Arm a fresh token for a new turn and mark it running.
    pub(crate) fn start_turn(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        self.is_running.store(true, Ordering::Release);
        token
    }

    pub(crate) fn finish_turn(&self) {
        self.is_running.store(false, Ordering::Release);
        self.idle_notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_idle_when_never_started() {
        let handle = ChatHandle::new();
        assert!(!handle.is_running());
        assert!(handle.wait_for_idle_timeout(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_running_turn_times_out_until_finished() {
        let handle = ChatHandle::new();
        handle.start_turn();
        assert!(!handle.wait_for_idle_timeout(Duration::from_millis(10)).await);
        handle.finish_turn();
        assert!(handle.wait_for_idle_timeout(Duration::from_millis(10)).await);
    }

    #[test]
    fn test_abort_cancels_current_turn_only() {
        let handle = ChatHandle::new();
        let first = handle.start_turn();
        handle.abort();
        assert!(first.is_cancelled());

        let second = handle.start_turn();
        assert!(!second.is_cancelled());
    }
}
