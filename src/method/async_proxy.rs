//! Cache-aside proxy for methods returning futures.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::proxy::{ProxyCore, ProxyStats};
use super::{KeyArgs, KeyBuilder};
use crate::cache::CacheClient;
use crate::error::{CacheError, CacheResult};

/// An async method as a free function taking the instance first.
pub type AsyncMethod<T, A, R, E> = for<'a> fn(&'a T, &'a A) -> BoxFuture<'a, Result<R, E>>;

/// [`MethodProxy`](super::MethodProxy) for async methods.
///
/// The cache client stays synchronous; only the wrapped method is awaited.
/// Dropping the future of a call before the method finishes skips the write.
pub struct AsyncMethodProxy<T, A, R, E> {
    core: ProxyCore,
    method: AsyncMethod<T, A, R, E>,
}

impl<T, A, R, E> AsyncMethodProxy<T, A, R, E> {
    pub fn new(
        name: &'static str,
        method: AsyncMethod<T, A, R, E>,
        keys: KeyBuilder,
        client: Arc<dyn CacheClient>,
    ) -> Self {
        Self {
            core: ProxyCore::new(name, keys, client),
            method,
        }
    }

    pub fn name(&self) -> &'static str {
        self.core.name()
    }

    pub fn key_builder(&self) -> &KeyBuilder {
        self.core.keys()
    }

    pub fn client(&self) -> &Arc<dyn CacheClient> {
        self.core.client()
    }

    pub fn stats(&self) -> ProxyStats {
        self.core.stats()
    }

    /// Run the wrapped method without touching the cache.
    pub async fn origin_method(&self, instance: &T, args: &A) -> Result<R, E> {
        (self.method)(instance, args).await
    }

    pub fn bind<'a>(self: &Arc<Self>, instance: &'a T) -> AsyncBoundProxy<'a, T, A, R, E> {
        AsyncBoundProxy {
            instance,
            proxy: Arc::clone(self),
        }
    }
}

impl<T, A, R, E> AsyncMethodProxy<T, A, R, E>
where
    A: KeyArgs,
{
    pub fn cache_key(&self, args: &A) -> CacheResult<String> {
        self.core.key(args)
    }
}

impl<T, A, R, E> AsyncMethodProxy<T, A, R, E>
where
    A: KeyArgs,
    R: Serialize + DeserializeOwned,
    E: From<CacheError>,
{
    /// Return the cached result for `args`, awaiting the method on a miss.
    pub async fn call(&self, instance: &T, args: &A) -> Result<R, E> {
        let key = self.core.key(args)?;
        if let Some(cached) = self.core.lookup(&key)? {
            return Ok(cached);
        }

        let fresh = (self.method)(instance, args).await?;
        self.core.store(&key, &fresh)?;
        Ok(fresh)
    }
}

impl<T, A, R, E> fmt::Debug for AsyncMethodProxy<T, A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncMethodProxy")
            .field("core", &self.core)
            .finish()
    }
}

/// An [`AsyncMethodProxy`] together with the instance it was accessed on.
pub struct AsyncBoundProxy<'a, T, A, R, E> {
    instance: &'a T,
    proxy: Arc<AsyncMethodProxy<T, A, R, E>>,
}

impl<'a, T, A, R, E> AsyncBoundProxy<'a, T, A, R, E> {
    pub fn instance(&self) -> &'a T {
        self.instance
    }

    pub fn proxy(&self) -> &Arc<AsyncMethodProxy<T, A, R, E>> {
        &self.proxy
    }

    pub fn name(&self) -> &'static str {
        self.proxy.name()
    }

    pub async fn origin_method(&self, args: &A) -> Result<R, E> {
        self.proxy.origin_method(self.instance, args).await
    }
}

impl<T, A, R, E> AsyncBoundProxy<'_, T, A, R, E>
where
    A: KeyArgs,
{
    pub fn cache_key(&self, args: &A) -> CacheResult<String> {
        self.proxy.cache_key(args)
    }
}

impl<T, A, R, E> AsyncBoundProxy<'_, T, A, R, E>
where
    A: KeyArgs,
    R: Serialize + DeserializeOwned,
    E: From<CacheError>,
{
    pub async fn call(&self, args: &A) -> Result<R, E> {
        self.proxy.call(self.instance, args).await
    }
}
