//! Instrumented cache clients for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;

use super::{CacheClient, MemoryCache};
use crate::error::{CacheError, CacheResult};

/// Memory cache that counts reads and writes.
#[derive(Debug, Default)]
pub(crate) struct CountingCache {
    inner: MemoryCache,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingCache {
    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl CacheClient for CountingCache {
    fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Value) -> CacheResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }
}

/// Client whose every operation fails.
#[derive(Debug, Default)]
pub(crate) struct BrokenCache;

impl CacheClient for BrokenCache {
    fn get(&self, _key: &str) -> CacheResult<Option<Value>> {
        Err(CacheError::backend("broken", "read refused"))
    }

    fn set(&self, _key: &str, _value: Value) -> CacheResult<()> {
        Err(CacheError::backend("broken", "write refused"))
    }
}
