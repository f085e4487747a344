//! Error types shared by cache clients and method proxies.

use thiserror::Error;

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised while reading, writing or keying cached method calls.
///
/// Wrapped methods pick their own error type; it only has to implement
/// `From<CacheError>` so these can flow through unchanged.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend '{backend}' failed: {message}")]
    Backend { backend: String, message: String },

    #[error("cached value could not be converted: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("argument of '{method}' could not be formatted into a cache key")]
    KeyFormat { method: String },
}

impl CacheError {
    /// Create a backend error for the named client.
    pub fn backend<B: Into<String>, M: Into<String>>(backend: B, message: M) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a key formatting error for the named method.
    pub fn key_format<S: Into<String>>(method: S) -> Self {
        Self::KeyFormat {
            method: method.into(),
        }
    }
}
