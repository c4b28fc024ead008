use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::warn;

use crate::client::{Client, ClientBuilder};
use crate::error::FlagwiseError;

/// Tracks the clients started through it, one per SDK key.
///
/// Starting a second live client for the same key is allowed but logged,
/// since each client polls on its own. Entries hold weak references, so a
/// dropped client frees its slot.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, Weak<Client>>>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a client and record it under its SDK key.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`ClientBuilder::start`].
    pub fn start(&self, builder: ClientBuilder) -> Result<Arc<Client>, FlagwiseError> {
        let client = Arc::new(builder.start()?);
        self.register(&client);
        Ok(client)
    }

    /// Record an already started client. Returns `false` when a live client
    /// with the same SDK key was already registered; the first one keeps its
    /// slot.
    pub fn register(&self, client: &Arc<Client>) -> bool {
        let key = client.config().sdk_key().to_owned();
        let mut clients = self.clients.lock();
        clients.retain(|_, existing| existing.strong_count() > 0);
        if clients.get(&key).is_some_and(|existing| existing.strong_count() > 0) {
            warn!(
                sdk_key = %client.config().obfuscated_sdk_key(),
                "duplicate client created for SDK key; consider sharing one client per key"
            );
            return false;
        }
        clients.insert(key, Arc::downgrade(client));
        true
    }

    /// The live client registered for `sdk_key`, if any.
    #[must_use]
    pub fn get(&self, sdk_key: &str) -> Option<Arc<Client>> {
        self.clients.lock().get(sdk_key).and_then(Weak::upgrade)
    }

    /// Number of registered clients that are still alive.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut clients = self.clients.lock();
        clients.retain(|_, client| client.strong_count() > 0);
        clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::store::testing::ScriptedTransport;

    fn builder(key: &str) -> ClientBuilder {
        let config = ClientConfig::builder().sdk_key(key).build().unwrap();
        Client::builder(config).transport(Arc::new(ScriptedTransport::default()))
    }

    #[tokio::test]
    async fn tracks_clients_per_key() {
        let registry = ClientRegistry::new();
        let a = registry.start(builder("prod-a")).unwrap();
        let b = registry.start(builder("prod-b")).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(Arc::ptr_eq(&registry.get("prod-a").unwrap(), &a));
        a.close().await;
        b.close().await;
    }

    #[tokio::test]
    async fn duplicate_keeps_first() {
        let registry = ClientRegistry::new();
        let first = registry.start(builder("prod-a")).unwrap();
        let second = Arc::new(builder("prod-a").start().unwrap());
        assert!(!registry.register(&second));
        assert!(Arc::ptr_eq(&registry.get("prod-a").unwrap(), &first));
        first.close().await;
        second.close().await;
    }

    #[tokio::test]
    async fn dropped_client_frees_slot() {
        let registry = ClientRegistry::new();
        let client = registry.start(builder("prod-a")).unwrap();
        drop(client);
        assert!(registry.get("prod-a").is_none());
        assert!(registry.is_empty());
        let again = registry.start(builder("prod-a")).unwrap();
        assert!(registry.get("prod-a").is_some());
        again.close().await;
    }

    #[tokio::test]
    async fn register_prunes_dropped_clients() {
        let registry = ClientRegistry::new();
        for key in ["prod-a", "prod-b", "prod-c"] {
            drop(registry.start(builder(key)).unwrap());
        }
        assert_eq!(registry.clients.lock().len(), 3);

        let live = registry.start(builder("prod-d")).unwrap();
        assert_eq!(registry.clients.lock().len(), 1);
        assert!(registry.clients.lock().contains_key("prod-d"));
        live.close().await;
    }
}
