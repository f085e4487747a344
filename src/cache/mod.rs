//! Cache module - cache clients used by method proxies.
//!
//! ## Architecture
//!
//! - `CacheClient` - the get/set contract proxies are written against
//! - `MemoryCache` - in-process client over a Moka-backed `TypedCache`
//! - `CacheRegistry` - clients by alias, with a lazily created `"default"`
//!
//! ## Usage
//!
//! ```rust
//! use method_cache::cache::{default_client, CacheClient};
//!
//! let cache = default_client();
//! cache.set("greeting", serde_json::json!("hello")).unwrap();
//! assert!(cache.get("greeting").unwrap().is_some());
//! ```

mod client;
mod config;
mod registry;
mod typed;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{CacheClient, MemoryCache};
pub use config::CacheConfig;
pub use registry::{CacheRegistry, DEFAULT_ALIAS, default_client, registry};
pub use typed::TypedCache;
