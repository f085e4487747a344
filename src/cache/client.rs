//! Cache client contract and the in-memory implementation.

use serde_json::Value;
use tracing::debug;

use super::{CacheConfig, TypedCache};
use crate::error::CacheResult;

/// Minimal key-value interface the method proxies are written against.
///
/// `get` returns `Ok(None)` when no entry exists. Implementations decide
/// persistence, expiry and distribution; the proxies only read and write.
pub trait CacheClient: Send + Sync {
    /// Read the value stored at `key`.
    fn get(&self, key: &str) -> CacheResult<Option<Value>>;

    /// Store `value` at `key`, replacing any previous entry.
    fn set(&self, key: &str, value: Value) -> CacheResult<()>;
}

/// Process-local cache client backed by Moka.
///
/// Clones share the same entries.
#[derive(Clone, Debug)]
pub struct MemoryCache {
    entries: TypedCache<String, Value>,
}

impl MemoryCache {
    /// Create a memory cache with the given name and config.
    pub fn new(name: &str, config: &CacheConfig) -> Self {
        debug!("Creating memory cache: {}", name);
        Self {
            entries: TypedCache::new(name, config),
        }
    }

    /// Name this cache was created with.
    pub fn name(&self) -> &str {
        self.entries.name()
    }

    /// Check if a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Remove one entry.
    pub fn delete(&self, key: &str) {
        self.entries.invalidate(key);
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new("default", &CacheConfig::default())
    }
}

impl CacheClient for MemoryCache {
    fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        Ok(self.entries.get(key))
    }

    fn set(&self, key: &str, value: Value) -> CacheResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}
