use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use crate::error::ReadyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Pending,
    Open,
    Closed,
}

/// One-shot signal raised when the first refresh attempt finishes.
///
/// The gate opens exactly once whether or not that attempt produced data.
/// The separate `successful` flag only ever flips from false to true and
/// records whether any attempt has installed a snapshot.
#[derive(Debug)]
pub struct ReadinessGate {
    state: watch::Sender<GateState>,
    successful: AtomicBool,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(GateState::Pending);
        Self {
            state,
            successful: AtomicBool::new(false),
        }
    }

    /// Open the gate. Returns `true` only for the call that actually opened it.
    pub fn open(&self) -> bool {
        self.transition(GateState::Open)
    }

    /// Release waiters without opening. Waiters observe
    /// [`ReadyError::Interrupted`]. No effect once the gate has fired.
    pub fn close(&self) -> bool {
        self.transition(GateState::Closed)
    }

    fn transition(&self, next: GateState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == GateState::Pending {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    pub fn mark_successful(&self) {
        self.successful.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.successful.load(Ordering::Acquire)
    }

    /// Whether the first attempt has finished.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.state.borrow() == GateState::Open
    }

    /// Wait until the gate fires, for at most `timeout`.
    ///
    /// Dropping the returned future abandons the wait.
    ///
    /// # Errors
    ///
    /// [`ReadyError::Timeout`] if the gate has not fired in time;
    /// [`ReadyError::Interrupted`] if it was closed instead of opened.
    pub async fn wait(&self, timeout: Duration) -> Result<(), ReadyError> {
        let mut rx = self.state.subscribe();
        let fired = tokio::time::timeout(timeout, async {
            rx.wait_for(|state| *state != GateState::Pending)
                .await
                .map(|state| *state)
        })
        .await;
        match fired {
            Ok(Ok(GateState::Open)) => Ok(()),
            Ok(_) => Err(ReadyError::Interrupted),
            Err(_) => Err(ReadyError::Timeout(timeout)),
        }
    }
}
