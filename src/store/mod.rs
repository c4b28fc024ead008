//! The flag snapshot and the background task that keeps it fresh.

mod gate;
mod provider;
mod snapshot;
mod sync;

pub use gate::ReadinessGate;
pub use provider::RefreshProvider;
pub use snapshot::{Snapshot, SnapshotStore};
pub use sync::{SyncOutcome, Syncer};
