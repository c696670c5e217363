use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    pub paused: bool,
    pub cancelled: bool,
}

/// Pause/resume/cancel flags for one run.
///
/// Flags are set synchronously by the caller and observed by the control loop only
/// at its suspension points. Cancellation is sticky and wins over pause.
#[derive(Debug, Clone)]
pub struct Control {
    tx: Arc<watch::Sender<ControlState>>,
}

impl Default for Control {
    fn default() -> Self {
        Self::new()
    }
}

impl Control {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ControlState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> ControlState {
        *self.tx.borrow()
    }

    pub fn is_paused(&self) -> bool {
        self.tx.borrow().paused
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.borrow().cancelled
    }

    /// Returns `false` if already paused or cancelled.
    pub fn pause(&self) -> bool {
        self.tx.send_if_modified(|s| {
            if s.paused || s.cancelled {
                return false;
            }
            s.paused = true;
            true
        })
    }

    /// Returns `false` unless the run was paused.
    pub fn resume(&self) -> bool {
        self.tx.send_if_modified(|s| {
            if !s.paused || s.cancelled {
                return false;
            }
            s.paused = false;
            true
        })
    }

    /// Returns `false` if cancellation was already requested.
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|s| {
            if s.cancelled {
                return false;
            }
            s.cancelled = true;
            true
        })
    }

    /// Block until the run is not paused. Returns `false` if it was cancelled instead.
    pub async fn wait_while_paused(&self) -> bool {
        let mut rx = self.tx.subscribe();
        rx.wait_for(|s| !s.paused || s.cancelled)
            .await
            .map(|s| !s.cancelled)
            .unwrap_or(false)
    }

    /// Sleep for `delay`, returning early once cancellation is requested.
    ///
    /// Returns `false` if the run was cancelled before or during the wait.
    pub async fn sleep_unless_cancelled(&self, delay: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        if delay.is_zero() {
            return true;
        }
        let mut rx = self.tx.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(delay) => !self.is_cancelled(),
            _ = rx.wait_for(|s| s.cancelled) => false,
        }
    }
}
