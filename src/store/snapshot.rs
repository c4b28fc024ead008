use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::parse::FlagPayload;
use crate::FeatureFlag;

/// A point-in-time, immutable set of flag definitions.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    project_name: String,
    environment_name: String,
    flags: HashMap<String, Arc<FeatureFlag>>,
}

impl Snapshot {
    #[must_use]
    pub fn new(
        project_name: impl Into<String>,
        environment_name: impl Into<String>,
        flags: impl IntoIterator<Item = FeatureFlag>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            environment_name: environment_name.into(),
            flags: flags
                .into_iter()
                .map(|f| (f.key().to_owned(), Arc::new(f)))
                .collect(),
        }
    }

    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    #[must_use]
    pub fn environment_name(&self) -> &str {
        &self.environment_name
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arc<FeatureFlag>> {
        self.flags.get(key)
    }

    pub fn flags(&self) -> impl Iterator<Item = &Arc<FeatureFlag>> {
        self.flags.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl From<FlagPayload> for Snapshot {
    fn from(payload: FlagPayload) -> Self {
        Snapshot::new(payload.project_name, payload.environment_name, payload.flags)
    }
}

/// Holds the active [`Snapshot`].
///
/// Reads never block and always see one complete snapshot; a refresh
/// replaces the whole snapshot in a single atomic store.
#[derive(Debug)]
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
        }
    }

    /// The snapshot active right now. Holding it pins that generation.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    #[must_use]
    pub fn get_flag(&self, key: &str) -> Option<Arc<FeatureFlag>> {
        self.current.load().get(key).cloned()
    }

    #[must_use]
    pub fn all_flags(&self) -> Vec<Arc<FeatureFlag>> {
        self.current.load().flags().cloned().collect()
    }

    #[must_use]
    pub fn exists(&self, key: &str) -> bool {
        self.current.load().get(key).is_some()
    }

    #[must_use]
    pub fn project_name(&self) -> String {
        self.current.load().project_name().to_owned()
    }

    #[must_use]
    pub fn environment_name(&self) -> String {
        self.current.load().environment_name().to_owned()
    }

    pub fn install(&self, snapshot: Snapshot) {
        self.current.store(Arc::new(snapshot));
    }

    /// Drop every flag and both names.
    pub fn reset(&self) {
        self.install(Snapshot::default());
    }
}
