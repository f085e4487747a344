//! Method module - cache-aside wrappers for instance methods.
//!
//! ## Architecture
//!
//! - `key` - turns a method name and call arguments into a cache key
//! - `MethodProxy` / `AsyncMethodProxy` - read the key, run the method on a
//!   miss, store the result
//! - `CachedMethod` / `AsyncCachedMethod` - build one proxy per instance on
//!   first access and reuse it through the instance's `ProxySlots`

mod async_proxy;
mod descriptor;
mod key;
mod proxy;

pub use async_proxy::{AsyncBoundProxy, AsyncMethod, AsyncMethodProxy};
pub use descriptor::{
    AsyncCachedMethod, CacheHost, CachedMethod, KeyBuilderFactory, ProxySlots, SLOT_PREFIX,
};
pub use key::{KeyArgs, KeyBuilder, KeyOptions, KeyParts, KeyScheme, build_key};
pub use proxy::{BoundProxy, Method, MethodProxy, ProxyStats};
