//! Cache-aside proxy around a single method.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{KeyArgs, KeyBuilder};
use crate::cache::CacheClient;
use crate::error::{CacheError, CacheResult};

/// A method as a free function taking the instance first.
pub type Method<T, A, R, E> = fn(&T, &A) -> Result<R, E>;

/// Hit and miss counters of one proxy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyStats {
    pub hits: u64,
    pub misses: u64,
}

impl ProxyStats {
    /// Fraction of lookups that were hits.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Key building, lookup and store shared by the sync and async proxies.
pub(crate) struct ProxyCore {
    name: &'static str,
    keys: KeyBuilder,
    client: Arc<dyn CacheClient>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ProxyCore {
    pub(crate) fn new(name: &'static str, keys: KeyBuilder, client: Arc<dyn CacheClient>) -> Self {
        Self {
            name,
            keys,
            client,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn keys(&self) -> &KeyBuilder {
        &self.keys
    }

    pub(crate) fn client(&self) -> &Arc<dyn CacheClient> {
        &self.client
    }

    pub(crate) fn key<A: KeyArgs + ?Sized>(&self, args: &A) -> CacheResult<String> {
        self.keys.build(self.name, args)
    }

    /// Read `key`. A stored `null` counts as a miss, same as no entry.
    pub(crate) fn lookup<R: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<R>> {
        match self.client.get(key)? {
            None | Some(Value::Null) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for {}", key);
                Ok(None)
            }
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {}", key);
                Ok(Some(serde_json::from_value(value)?))
            }
        }
    }

    pub(crate) fn store<R: Serialize>(&self, key: &str, value: &R) -> CacheResult<()> {
        let value = serde_json::to_value(value)?;
        self.client.set(key, value)?;
        debug!("Stored result of {} at {}", self.name, key);
        Ok(())
    }

    pub(crate) fn stats(&self) -> ProxyStats {
        ProxyStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for ProxyCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCore")
            .field("name", &self.name)
            .field("keys", &self.keys)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Cache-aside wrapper for one method.
///
/// Every call reads the cache once; a miss runs the method and writes the
/// result once. Concurrent misses on the same key each run the method and
/// each write; nothing coordinates them.
pub struct MethodProxy<T, A, R, E> {
    core: ProxyCore,
    method: Method<T, A, R, E>,
}

impl<T, A, R, E> MethodProxy<T, A, R, E> {
    pub fn new(
        name: &'static str,
        method: Method<T, A, R, E>,
        keys: KeyBuilder,
        client: Arc<dyn CacheClient>,
    ) -> Self {
        Self {
            core: ProxyCore::new(name, keys, client),
            method,
        }
    }

    /// Name of the wrapped method.
    pub fn name(&self) -> &'static str {
        self.core.name()
    }

    pub fn key_builder(&self) -> &KeyBuilder {
        self.core.keys()
    }

    /// Cache client this proxy reads and writes.
    pub fn client(&self) -> &Arc<dyn CacheClient> {
        self.core.client()
    }

    pub fn stats(&self) -> ProxyStats {
        self.core.stats()
    }

    /// Run the wrapped method without touching the cache.
    pub fn origin_method(&self, instance: &T, args: &A) -> Result<R, E> {
        (self.method)(instance, args)
    }

    /// Bind this proxy to an instance.
    pub fn bind<'a>(self: &Arc<Self>, instance: &'a T) -> BoundProxy<'a, T, A, R, E> {
        BoundProxy {
            instance,
            proxy: Arc::clone(self),
        }
    }
}

impl<T, A, R, E> MethodProxy<T, A, R, E>
where
    A: KeyArgs,
{
    /// Key a call with `args` reads and writes.
    pub fn cache_key(&self, args: &A) -> CacheResult<String> {
        self.core.key(args)
    }
}

impl<T, A, R, E> MethodProxy<T, A, R, E>
where
    A: KeyArgs,
    R: Serialize + DeserializeOwned,
    E: From<CacheError>,
{
    /// Return the cached result for `args`, computing and storing it on a miss.
    pub fn call(&self, instance: &T, args: &A) -> Result<R, E> {
        let key = self.core.key(args)?;
        if let Some(cached) = self.core.lookup(&key)? {
            return Ok(cached);
        }

        let fresh = (self.method)(instance, args)?;
        self.core.store(&key, &fresh)?;
        Ok(fresh)
    }
}

impl<T, A, R, E> fmt::Debug for MethodProxy<T, A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodProxy")
            .field("core", &self.core)
            .finish()
    }
}

/// A [`MethodProxy`] together with the instance it was accessed on.
pub struct BoundProxy<'a, T, A, R, E> {
    instance: &'a T,
    proxy: Arc<MethodProxy<T, A, R, E>>,
}

impl<'a, T, A, R, E> BoundProxy<'a, T, A, R, E> {
    pub fn instance(&self) -> &'a T {
        self.instance
    }

    /// The shared proxy; the same `Arc` for every access on one instance.
    pub fn proxy(&self) -> &Arc<MethodProxy<T, A, R, E>> {
        &self.proxy
    }

    pub fn name(&self) -> &'static str {
        self.proxy.name()
    }

    pub fn origin_method(&self, args: &A) -> Result<R, E> {
        self.proxy.origin_method(self.instance, args)
    }
}

impl<T, A, R, E> BoundProxy<'_, T, A, R, E>
where
    A: KeyArgs,
{
    pub fn cache_key(&self, args: &A) -> CacheResult<String> {
        self.proxy.cache_key(args)
    }
}

impl<T, A, R, E> BoundProxy<'_, T, A, R, E>
where
    A: KeyArgs,
    R: Serialize + DeserializeOwned,
    E: From<CacheError>,
{
    pub fn call(&self, args: &A) -> Result<R, E> {
        self.proxy.call(self.instance, args)
    }
}
