//! Cache registry - named cache clients and the process-wide default.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, info};

use super::{CacheClient, CacheConfig, MemoryCache};
use crate::config;

/// Alias of the client used when an instance supplies no override.
pub const DEFAULT_ALIAS: &str = "default";

static GLOBAL: Lazy<CacheRegistry> =
    Lazy::new(|| CacheRegistry::with_default_config(config::settings().cache.clone()));

/// Registry of cache clients by alias.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use method_cache::cache::{CacheRegistry, MemoryCache};
///
/// let registry = CacheRegistry::new();
/// registry.register("sessions", Arc::new(MemoryCache::default()));
///
/// assert!(registry.get("sessions").is_some());
/// ```
#[derive(Clone)]
pub struct CacheRegistry {
    clients: Arc<RwLock<HashMap<String, Arc<dyn CacheClient>>>>,
    default_config: CacheConfig,
}

impl CacheRegistry {
    /// Create a new empty cache registry.
    pub fn new() -> Self {
        Self::with_default_config(CacheConfig::default())
    }

    /// Create a registry whose lazily created default client uses `config`.
    pub fn with_default_config(config: CacheConfig) -> Self {
        info!("Cache registry initialized");
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            default_config: config,
        }
    }

    /// Register a client under `alias`, returning the one it replaced.
    pub fn register(
        &self,
        alias: &str,
        client: Arc<dyn CacheClient>,
    ) -> Option<Arc<dyn CacheClient>> {
        debug!("Registering cache client: {}", alias);
        self.clients.write().insert(alias.to_string(), client)
    }

    /// Get a client by alias.
    pub fn get(&self, alias: &str) -> Option<Arc<dyn CacheClient>> {
        self.clients.read().get(alias).cloned()
    }

    /// Get the `"default"` client, creating a [`MemoryCache`] on first use.
    pub fn default_client(&self) -> Arc<dyn CacheClient> {
        if let Some(client) = self.get(DEFAULT_ALIAS) {
            return client;
        }

        let mut clients = self.clients.write();
        clients
            .entry(DEFAULT_ALIAS.to_string())
            .or_insert_with(|| {
                debug!("Creating default cache client");
                Arc::new(MemoryCache::new(DEFAULT_ALIAS, &self.default_config))
            })
            .clone()
    }

    /// Check if a client with the given alias exists.
    pub fn contains(&self, alias: &str) -> bool {
        self.clients.read().contains_key(alias)
    }

    /// Remove a client from the registry.
    ///
    /// Returns `true` if the client was removed.
    pub fn remove(&self, alias: &str) -> bool {
        let removed = self.clients.write().remove(alias).is_some();
        if removed {
            debug!("Removed cache client: {}", alias);
        }
        removed
    }

    /// Get the number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    /// Get a list of all registered aliases.
    pub fn aliases(&self) -> Vec<String> {
        self.clients.read().keys().cloned().collect()
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clients = self.clients.read();
        f.debug_struct("CacheRegistry")
            .field("client_count", &clients.len())
            .field("aliases", &clients.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The process-wide registry.
pub fn registry() -> &'static CacheRegistry {
    &GLOBAL
}

/// The process-wide default cache client.
pub fn default_client() -> Arc<dyn CacheClient> {
    registry().default_client()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_default_client_is_created_once() {
        let registry = CacheRegistry::new();
        assert!(registry.is_empty());

        let first = registry.default_client();
        let second = registry.default_client();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.aliases(), vec![DEFAULT_ALIAS.to_string()]);
    }

    #[test]
    fn test_registered_default_wins() {
        let registry = CacheRegistry::new();
        let custom: Arc<dyn CacheClient> = Arc::new(MemoryCache::default());
        custom.set("marker", json!(true)).unwrap();

        assert!(registry.register(DEFAULT_ALIAS, custom).is_none());

        let client = registry.default_client();
        assert_eq!(client.get("marker").unwrap(), Some(json!(true)));
    }

    #[test]
    fn test_register_replace_and_remove() {
        let registry = CacheRegistry::new();
        registry.register("a", Arc::new(MemoryCache::default()));

        let replaced = registry.register("a", Arc::new(MemoryCache::default()));
        assert!(replaced.is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("a"));

        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        assert!(registry.get("a").is_none());
    }

    #[test]
    fn test_global_default_client_is_shared() {
        let first = default_client();
        let second = default_client();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
