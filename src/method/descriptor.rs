//! Per-instance installation of method proxies.
//!
//! A [`CachedMethod`] describes a cached method once, usually as a `static`.
//! Accessing it on an instance builds the proxy on first use and keeps it in
//! the instance's [`ProxySlots`], so later accesses share it:
//!
//! ```rust
//! use method_cache::error::CacheError;
//! use method_cache::method::{BoundProxy, CacheHost, CachedMethod, ProxySlots};
//!
//! #[derive(Default)]
//! struct Pricing {
//!     slots: ProxySlots,
//! }
//!
//! impl CacheHost for Pricing {
//!     fn proxy_slots(&self) -> &ProxySlots {
//!         &self.slots
//!     }
//! }
//!
//! fn quote(_pricing: &Pricing, args: &(u32, u32)) -> Result<u32, CacheError> {
//!     Ok(args.0 * args.1)
//! }
//!
//! static QUOTE: CachedMethod<Pricing, (u32, u32), u32, CacheError> =
//!     CachedMethod::new("quote", quote).with_prefix("doctest");
//!
//! impl Pricing {
//!     fn quote(&self) -> BoundProxy<'_, Self, (u32, u32), u32, CacheError> {
//!         QUOTE.get(self)
//!     }
//! }
//!
//! let pricing = Pricing::default();
//! assert_eq!(pricing.quote().call(&(3, 4)).unwrap(), 12);
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::{
    AsyncBoundProxy, AsyncMethod, AsyncMethodProxy, BoundProxy, KeyBuilder, Method, MethodProxy,
};
use crate::cache::{CacheClient, default_client};
use crate::config;

/// Prefix of the slot a method's proxy is kept under.
pub const SLOT_PREFIX: &str = "_proxy_to_";

/// Types whose methods can be cached.
pub trait CacheHost {
    /// Where this instance keeps its proxies.
    fn proxy_slots(&self) -> &ProxySlots;

    /// Cache client for this instance. `None` uses the process-wide default.
    fn cache(&self) -> Option<Arc<dyn CacheClient>> {
        None
    }
}

/// Type-erased proxies of one instance, by slot name.
#[derive(Default)]
pub struct ProxySlots {
    slots: DashMap<String, Slot>,
}

/// Internal slot storing a type-erased proxy.
struct Slot {
    proxy: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ProxySlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the proxy in `slot`, creating it with `init` if the slot is empty.
    ///
    /// `init` runs without any slot lock held, so it may read these slots.
    /// Concurrent first accesses can each run `init`; the first proxy stored
    /// wins and every caller gets that one.
    ///
    /// # Panics
    /// Panics if the slot already holds a proxy of a different type.
    pub fn get_or_init<P, F>(&self, slot: &str, init: F) -> Arc<P>
    where
        P: Any + Send + Sync,
        F: FnOnce() -> P,
    {
        let (proxy, stored_type) = match self.find(slot) {
            Some(found) => found,
            None => {
                let built: Arc<dyn Any + Send + Sync> = Arc::new(init());
                let entry = self.slots.entry(slot.to_string()).or_insert_with(|| {
                    debug!("Installing proxy in slot {}", slot);
                    Slot {
                        proxy: built,
                        type_name: type_name::<P>(),
                    }
                });
                (Arc::clone(&entry.proxy), entry.type_name)
            }
        };

        match proxy.downcast::<P>() {
            Ok(proxy) => proxy,
            Err(_) => panic!(
                "Proxy slot '{}' type mismatch: expected {}, got {}",
                slot,
                type_name::<P>(),
                stored_type
            ),
        }
    }

    fn find(&self, slot: &str) -> Option<(Arc<dyn Any + Send + Sync>, &'static str)> {
        self.slots
            .get(slot)
            .map(|entry| (Arc::clone(&entry.proxy), entry.type_name))
    }

    /// Check if a slot has been filled.
    pub fn contains(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Names of all filled slots.
    pub fn slot_names(&self) -> Vec<String> {
        self.slots.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl fmt::Debug for ProxySlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySlots")
            .field("slot_names", &self.slot_names())
            .finish()
    }
}

fn slot_name(method_name: &str) -> String {
    format!("{}{}", SLOT_PREFIX, method_name)
}

/// Builds the key builder a method's proxies use.
pub type KeyBuilderFactory = fn() -> KeyBuilder;

fn key_builder(prefix: Option<&'static str>, factory: Option<KeyBuilderFactory>) -> KeyBuilder {
    if let Some(factory) = factory {
        return factory();
    }
    let settings = config::settings();
    match prefix {
        Some(prefix) => KeyBuilder::new(prefix).options(settings.key_options),
        None => settings.key_builder(),
    }
}

fn client_for<T: CacheHost>(instance: &T) -> Arc<dyn CacheClient> {
    instance.cache().unwrap_or_else(default_client)
}

/// A cached method, declared once and accessed per instance.
///
/// Holds no mutable state; proxies live in each instance's [`ProxySlots`].
pub struct CachedMethod<T, A, R, E> {
    name: &'static str,
    method: Method<T, A, R, E>,
    prefix: Option<&'static str>,
    keys: Option<KeyBuilderFactory>,
}

impl<T, A, R, E> CachedMethod<T, A, R, E> {
    pub const fn new(name: &'static str, method: Method<T, A, R, E>) -> Self {
        Self {
            name,
            method,
            prefix: None,
            keys: None,
        }
    }

    /// Use `prefix` instead of the configured key prefix.
    #[must_use]
    pub const fn with_prefix(self, prefix: &'static str) -> Self {
        Self {
            prefix: Some(prefix),
            ..self
        }
    }

    /// Build proxies with the key builder `factory` returns.
    ///
    /// Replaces both the configured prefix and any `with_prefix`, and can
    /// swap the key layout through [`KeyBuilder::scheme`].
    #[must_use]
    pub const fn with_key_builder(self, factory: KeyBuilderFactory) -> Self {
        Self {
            keys: Some(factory),
            ..self
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Slot this method's proxy is kept under on each instance.
    pub fn slot_name(&self) -> String {
        slot_name(self.name)
    }
}

impl<T, A, R, E> CachedMethod<T, A, R, E>
where
    T: CacheHost + 'static,
    A: 'static,
    R: 'static,
    E: 'static,
{
    /// The proxy for `instance`, installed on first access.
    pub fn get<'a>(&self, instance: &'a T) -> BoundProxy<'a, T, A, R, E> {
        let proxy = instance.proxy_slots().get_or_init(&self.slot_name(), || {
            MethodProxy::new(
                self.name,
                self.method,
                key_builder(self.prefix, self.keys),
                client_for(instance),
            )
        });
        proxy.bind(instance)
    }
}

impl<T, A, R, E> fmt::Debug for CachedMethod<T, A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedMethod")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("custom_keys", &self.keys.is_some())
            .finish()
    }
}

/// [`CachedMethod`] for async methods.
pub struct AsyncCachedMethod<T, A, R, E> {
    name: &'static str,
    method: AsyncMethod<T, A, R, E>,
    prefix: Option<&'static str>,
    keys: Option<KeyBuilderFactory>,
}

impl<T, A, R, E> AsyncCachedMethod<T, A, R, E> {
    pub const fn new(name: &'static str, method: AsyncMethod<T, A, R, E>) -> Self {
        Self {
            name,
            method,
            prefix: None,
            keys: None,
        }
    }

    #[must_use]
    pub const fn with_prefix(self, prefix: &'static str) -> Self {
        Self {
            prefix: Some(prefix),
            ..self
        }
    }

    #[must_use]
    pub const fn with_key_builder(self, factory: KeyBuilderFactory) -> Self {
        Self {
            keys: Some(factory),
            ..self
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn slot_name(&self) -> String {
        slot_name(self.name)
    }
}

impl<T, A, R, E> AsyncCachedMethod<T, A, R, E>
where
    T: CacheHost + 'static,
    A: 'static,
    R: 'static,
    E: 'static,
{
    pub fn get<'a>(&self, instance: &'a T) -> AsyncBoundProxy<'a, T, A, R, E> {
        let proxy = instance.proxy_slots().get_or_init(&self.slot_name(), || {
            AsyncMethodProxy::new(
                self.name,
                self.method,
                key_builder(self.prefix, self.keys),
                client_for(instance),
            )
        });
        proxy.bind(instance)
    }
}

impl<T, A, R, E> fmt::Debug for AsyncCachedMethod<T, A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCachedMethod")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("custom_keys", &self.keys.is_some())
            .finish()
    }
}
