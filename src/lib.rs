//! Method Cache - cache-aside wrappers for instance methods.
//!
//! A cached method builds a key from its name and arguments, returns the
//! stored value when the cache has one, and otherwise runs the method and
//! stores its result.
//!
//! ## Architecture
//!
//! - `method` - key building, method proxies and per-instance descriptors
//! - `cache` - the cache client contract, a Moka-backed client, the registry
//! - `config` - environment configuration, installable at startup
//! - `error` - shared error type
//! - `logging` - tracing subscriber setup

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod method;

pub use cache::{CacheClient, CacheConfig, CacheRegistry, MemoryCache, default_client};
pub use config::Config;
pub use error::{CacheError, CacheResult};
pub use method::{
    AsyncCachedMethod, BoundProxy, CacheHost, CachedMethod, KeyArgs, KeyBuilder, KeyParts,
    MethodProxy, ProxySlots,
};
