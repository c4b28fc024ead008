use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{ReadinessGate, Snapshot, SnapshotStore};
use crate::parse::{parse_payload, FlagPayload};
use crate::transport::Transport;

const SDK_KEY_HELP: &str = "The SDK key was rejected by the server. This is not recoverable by \
    retrying: check that the key belongs to the intended project and environment. All evaluations \
    will serve control until valid flags are downloaded.";

/// Result of one sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A new snapshot with this many flags was installed.
    Installed(usize),
    /// The server reported no change; the snapshot was kept.
    NotModified,
    /// The server rejected the SDK key (HTTP 403).
    Rejected,
    /// Transport, status or parse failure; the snapshot was kept.
    Failed,
}

impl SyncOutcome {
    #[must_use]
    pub fn installed(self) -> bool {
        matches!(self, SyncOutcome::Installed(_))
    }
}

/// Per-attempt sync state machine.
///
/// The first attempt tries the bulk snapshot and falls back to the
/// incremental API in the same attempt. Every later attempt goes straight to
/// the incremental API with the last seen `Last-Modified` value.
pub struct Syncer {
    transport: Arc<dyn Transport>,
    store: Arc<SnapshotStore>,
    gate: Arc<ReadinessGate>,
    bulk_attempted: bool,
    last_modified: Option<String>,
}

impl std::fmt::Debug for Syncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Syncer")
            .field("bulk_attempted", &self.bulk_attempted)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}

impl Syncer {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<SnapshotStore>,
        gate: Arc<ReadinessGate>,
    ) -> Self {
        Self {
            transport,
            store,
            gate,
            bulk_attempted: false,
            last_modified: None,
        }
    }

    #[must_use]
    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }

    /// Run one attempt. Never fails: every fault is logged and reported as
    /// an outcome, leaving the current snapshot in place.
    pub async fn sync(&mut self) -> SyncOutcome {
        if !self.bulk_attempted {
            self.bulk_attempted = true;
            if let Some(count) = self.sync_bulk().await {
                return SyncOutcome::Installed(count);
            }
        }
        self.sync_incremental().await
    }

    async fn sync_bulk(&mut self) -> Option<usize> {
        let response = match self.transport.fetch_bulk_snapshot().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "bulk snapshot fetch failed");
                return None;
            }
        };
        if response.status != 200 {
            debug!(status = response.status, "bulk snapshot unavailable");
            return None;
        }
        match parse_payload(&response.body) {
            Ok(payload) if payload.flags.is_empty() => {
                debug!("bulk snapshot has no flags");
                None
            }
            Ok(payload) => Some(self.install(payload)),
            Err(e) => {
                warn!(error = %e, "unable to parse bulk snapshot");
                None
            }
        }
    }

    async fn sync_incremental(&mut self) -> SyncOutcome {
        let response = match self
            .transport
            .fetch_incremental(self.last_modified.as_deref())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "unable to fetch flags");
                return SyncOutcome::Failed;
            }
        };

        match response.status {
            304 => {
                debug!(
                    flags = self.store.snapshot().len(),
                    "synced with server, no update"
                );
                SyncOutcome::NotModified
            }
            200 => match parse_payload(&response.body) {
                Ok(payload) => {
                    if response.last_modified.is_some() {
                        self.last_modified = response.last_modified;
                    }
                    SyncOutcome::Installed(self.install(payload))
                }
                Err(e) => {
                    warn!(error = %e, "unable to parse flags response");
                    SyncOutcome::Failed
                }
            },
            403 => {
                error!(status = 403, "{SDK_KEY_HELP}");
                SyncOutcome::Rejected
            }
            status => {
                error!(status, body = %response.body, "HTTP error downloading flags");
                SyncOutcome::Failed
            }
        }
    }

    fn install(&self, payload: FlagPayload) -> usize {
        let count = payload.flags.len();
        self.store.install(Snapshot::from(payload));
        if self.gate.is_successful() {
            info!(flags = count, "synced latest flags");
        } else {
            info!(flags = count, "initial sync successful, client is ready");
        }
        self.gate.mark_successful();
        count
    }
}
