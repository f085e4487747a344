//! Typed cache wrapper around Moka.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;

use moka::sync::Cache;

use super::CacheConfig;

/// A named, typed cache over Moka.
///
/// Cloning is cheap and shares the same underlying cache.
pub struct TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Cache<K, V>>,
    name: Arc<str>,
}

// Manual Clone implementation that doesn't require K: Clone, V: Clone
impl<K, V> Clone for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            name: Arc::clone(&self.name),
        }
    }
}

impl<K, V> TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a new typed cache with the given name and config.
    pub fn new(name: impl Into<Arc<str>>, config: &CacheConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_capacity);

        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }

        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }

        Self {
            inner: Arc::new(builder.build()),
            name: name.into(),
        }
    }

    /// Get the name of this cache.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a key-value pair into the cache.
    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    /// Get a value from the cache.
    ///
    /// Returns `Some(value)` if the key exists and hasn't expired.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get(key)
    }

    /// Check if a key exists in the cache.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(key)
    }

    /// Remove a key from the cache.
    pub fn invalidate<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.invalidate(key);
    }

    /// Remove all entries from the cache.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl<K, V> std::fmt::Debug for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCache")
            .field("name", &self.name)
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_entries() {
        let cache: TypedCache<String, u32> = TypedCache::new("shared", &CacheConfig::default());
        let other = cache.clone();

        cache.insert("a".to_string(), 1);

        assert_eq!(other.get("a"), Some(1));
        assert_eq!(other.name(), "shared");
    }

    #[test]
    fn test_invalidate_removes_entry() {
        let cache: TypedCache<String, u32> = TypedCache::new("inv", &CacheConfig::default());
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);

        cache.invalidate("a");
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));

        cache.invalidate_all();
        assert_eq!(cache.get("b"), None);
    }
}
