use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ReadinessGate, SnapshotStore, SyncOutcome, Syncer};
use crate::error::{FlagwiseError, ReadyError};
use crate::transport::Transport;

/// Owns the background refresh task.
///
/// Runs at a fixed delay: the next attempt is scheduled `interval` after the
/// previous one finishes, so slow fetches never overlap. The readiness gate
/// opens after the first attempt whatever its outcome.
#[derive(Debug)]
pub struct RefreshProvider {
    store: Arc<SnapshotStore>,
    gate: Arc<ReadinessGate>,
    syncer: Arc<AsyncMutex<Syncer>>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    close_timeout: Duration,
}

impl RefreshProvider {
    /// Spawn the refresh task on the current Tokio runtime. The first
    /// attempt starts immediately.
    ///
    /// # Errors
    ///
    /// Returns [`FlagwiseError::NoRuntime`] when called outside a runtime.
    pub fn start(
        transport: Arc<dyn Transport>,
        interval: Duration,
        close_timeout: Duration,
    ) -> Result<Self, FlagwiseError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| FlagwiseError::NoRuntime)?;

        let store = Arc::new(SnapshotStore::new());
        let gate = Arc::new(ReadinessGate::new());
        let syncer = Arc::new(AsyncMutex::new(Syncer::new(
            transport,
            Arc::clone(&store),
            Arc::clone(&gate),
        )));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let task = runtime.spawn(refresh_loop(
            Arc::clone(&syncer),
            Arc::clone(&gate),
            interval,
            shutdown_rx,
        ));
        debug!(?interval, "refresh task started");

        Ok(Self {
            store,
            gate,
            syncer,
            shutdown,
            task: Mutex::new(Some(task)),
            closed: AtomicBool::new(false),
            close_timeout,
        })
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    #[must_use]
    pub fn gate(&self) -> &Arc<ReadinessGate> {
        &self.gate
    }

    /// Whether any attempt has installed flags.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.gate.is_successful()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Wait for the first refresh attempt to finish.
    ///
    /// # Errors
    ///
    /// See [`ReadinessGate::wait`].
    pub async fn await_ready(&self, timeout: Duration) -> Result<(), ReadyError> {
        self.gate.wait(timeout).await
    }

    /// Run one attempt now, outside the schedule. Waits for an in-flight
    /// scheduled attempt to finish first. Returns `None` once closed,
    /// including when the provider is closed while this call is waiting or
    /// fetching; nothing is installed in that case.
    pub async fn refresh_now(&self) -> Option<SyncOutcome> {
        if self.is_closed() {
            return None;
        }
        let mut shutdown = self.shutdown.subscribe();
        let mut syncer = tokio::select! {
            biased;
            () = stopped(&mut shutdown) => return None,
            syncer = self.syncer.lock() => syncer,
        };
        if self.is_closed() {
            return None;
        }
        let outcome = tokio::select! {
            biased;
            () = stopped(&mut shutdown) => return None,
            outcome = syncer.sync() => outcome,
        };
        self.gate.open();
        Some(outcome)
    }

    /// Stop the schedule and drop the snapshot.
    ///
    /// Waits up to the configured close timeout for an in-flight attempt,
    /// then aborts it. Waiters still blocked on readiness are interrupted.
    /// Closing twice is a no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("refresh provider already closed");
            return;
        }
        self.shutdown.send_replace(true);

        let task = self.task.lock().take();
        if let Some(mut task) = task {
            if tokio::time::timeout(self.close_timeout, &mut task).await.is_err() {
                warn!(timeout = ?self.close_timeout, "refresh task did not stop in time, aborting");
                task.abort();
            }
        }

        // Holding the syncer while resetting keeps a concurrent `refresh_now`
        // from installing after the reset.
        let _syncer = match tokio::time::timeout(self.close_timeout, self.syncer.lock()).await {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!(timeout = ?self.close_timeout, "in-flight refresh did not stop in time");
                None
            }
        };
        self.store.reset();
        self.gate.close();
        info!("refresh provider closed");
    }
}

impl Drop for RefreshProvider {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

async fn refresh_loop(
    syncer: Arc<AsyncMutex<Syncer>>,
    gate: Arc<ReadinessGate>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let attempt = async {
            let mut syncer = syncer.lock().await;
            syncer.sync().await
        };
        tokio::select! {
            biased;
            () = stopped(&mut shutdown) => break,
            outcome = attempt => debug!(?outcome, "refresh attempt finished"),
        }
        if gate.open() {
            debug!(successful = gate.is_successful(), "first refresh attempt complete");
        }

        tokio::select! {
            biased;
            () = stopped(&mut shutdown) => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
    debug!("refresh loop stopped");
}

/// Resolves once shutdown is requested or the provider is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
