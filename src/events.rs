//! Evaluation notifications.
//!
//! The client reports every flag evaluation to an [`EventSink`]. Sinks are
//! fire-and-forget: they must not block and cannot fail the evaluation.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

use crate::Reason;

/// One evaluation, as reported to the events pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Impression {
    pub flag_key: String,
    pub user_id: String,
    pub variation_key: String,
    pub flag_enabled: bool,
    pub reason: Reason,
    pub created_at: DateTime<Utc>,
}

/// Receiver of [`Impression`]s.
///
/// `record` runs inline on the evaluating thread, so implementations should
/// hand the impression off and return. A panic inside `record` is caught and
/// logged by the client; the evaluation result is still returned.
pub trait EventSink: Send + Sync {
    fn record(&self, impression: Impression);
}

/// Discards every impression.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn record(&self, _impression: Impression) {}
}

/// Forwards impressions into a bounded channel. A full or closed channel
/// drops the impression with a warning.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Impression>,
}

impl ChannelSink {
    /// Create a sink and the receiving half of its channel.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Impression>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn record(&self, impression: Impression) {
        match self.tx.try_send(impression) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(flag = dropped.flag_key.as_str(), "impression channel full, dropping");
            }
            Err(TrySendError::Closed(dropped)) => {
                warn!(flag = dropped.flag_key.as_str(), "impression channel closed, dropping");
            }
        }
    }
}
