//! Configuration module.
//!
//! [`settings`] reads `METHOD_CACHE_*` variables from the process
//! environment the first time it is used. The library never reads a `.env`
//! file on its own; applications that keep settings there call
//! [`Config::from_env`] and hand the result to [`init`] at startup:
//!
//! ```rust
//! use method_cache::config::{self, Config};
//!
//! let _ = config::init(Config::from_env());
//! assert!(!config::settings().key_prefix.is_empty());
//! ```

use std::env;
use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::OnceCell;
use tracing::warn;

use crate::cache::CacheConfig;
use crate::method::{KeyBuilder, KeyOptions};

/// Key prefix used when nothing else is configured.
pub const DEFAULT_KEY_PREFIX: &str = "method_cache";

static SETTINGS: OnceCell<Config> = OnceCell::new();

/// Library configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Prefix placed in front of every cache key.
    pub key_prefix: String,

    /// How key parts are encoded.
    pub key_options: KeyOptions,

    /// Settings for the lazily created default cache client.
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            key_options: KeyOptions::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a `.env` file, if any, and the environment.
    ///
    /// Variables already set in the process win over the file. Missing
    /// variables use defaults; malformed ones are logged and ignored.
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!("Failed to load .env file: {}", e);
            }
        }
        Self::from_process_env()
    }

    /// Load configuration from the process environment only.
    pub fn from_process_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let key_prefix = lookup("METHOD_CACHE_KEY_PREFIX")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.key_prefix);

        let key_options = KeyOptions {
            escape_delimiter: parse_var(&lookup, "METHOD_CACHE_ESCAPE_KEYS")
                .unwrap_or(defaults.key_options.escape_delimiter),
            sort_keyword_args: parse_var(&lookup, "METHOD_CACHE_SORT_KWARGS")
                .unwrap_or(defaults.key_options.sort_keyword_args),
        };

        // 0 disables expiry
        let seconds = |name: &'static str| {
            parse_var::<u64, _>(&lookup, name)
                .map(|secs| (secs > 0).then(|| Duration::from_secs(secs)))
        };

        let mut cache = defaults.cache;
        if let Some(capacity) = parse_var(&lookup, "METHOD_CACHE_MAX_CAPACITY") {
            cache = cache.max_capacity(capacity);
        }
        cache = match seconds("METHOD_CACHE_TTL_SECS") {
            Some(Some(ttl)) => cache.ttl(ttl),
            Some(None) => cache.no_ttl(),
            None => cache,
        };
        if let Some(Some(tti)) = seconds("METHOD_CACHE_TTI_SECS") {
            cache = cache.tti(tti);
        }

        Self {
            key_prefix,
            key_options,
            cache,
        }
    }

    /// Key builder for descriptors that don't override the prefix.
    pub fn key_builder(&self) -> KeyBuilder {
        KeyBuilder::new(self.key_prefix.clone()).options(self.key_options)
    }
}

/// Install the process-wide configuration.
///
/// Must run before the first cached call or [`settings`] lookup.
///
/// # Errors
/// Returns `config` back if settings were already installed or loaded.
pub fn init(config: Config) -> Result<(), Config> {
    SETTINGS.set(config)
}

/// Process-wide configuration.
///
/// Whatever [`init`] installed, otherwise [`Config::from_process_env`]
/// loaded on first use.
pub fn settings() -> &'static Config {
    SETTINGS.get_or_init(Config::from_process_env)
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {:?}", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.key_prefix, DEFAULT_KEY_PREFIX);
    }

    #[test]
    fn test_reads_all_variables() {
        let config = Config::from_lookup(lookup_from(&[
            ("METHOD_CACHE_KEY_PREFIX", "djsettings"),
            ("METHOD_CACHE_ESCAPE_KEYS", "true"),
            ("METHOD_CACHE_SORT_KWARGS", "true"),
            ("METHOD_CACHE_MAX_CAPACITY", "42"),
            ("METHOD_CACHE_TTL_SECS", "0"),
            ("METHOD_CACHE_TTI_SECS", "15"),
        ]));

        assert_eq!(config.key_prefix, "djsettings");
        assert!(config.key_options.escape_delimiter);
        assert!(config.key_options.sort_keyword_args);
        assert_eq!(config.cache.max_capacity, 42);
        assert_eq!(config.cache.ttl, None);
        assert_eq!(config.cache.tti, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("METHOD_CACHE_KEY_PREFIX", "   "),
            ("METHOD_CACHE_MAX_CAPACITY", "lots"),
            ("METHOD_CACHE_ESCAPE_KEYS", "yes please"),
        ]));

        assert_eq!(config.key_prefix, DEFAULT_KEY_PREFIX);
        assert_eq!(config.cache.max_capacity, 10_000);
        assert!(!config.key_options.escape_delimiter);
    }

    #[test]
    fn test_key_builder_uses_prefix() {
        let config = Config::from_lookup(lookup_from(&[("METHOD_CACHE_KEY_PREFIX", "app")]));
        assert_eq!(config.key_builder().prefix(), "app");
    }

    #[test]
    fn test_zero_ttl_disables_expiry_but_keeps_other_defaults() {
        let config = Config::from_lookup(lookup_from(&[("METHOD_CACHE_TTL_SECS", "0")]));

        assert_eq!(config.cache.ttl, None);
        assert_eq!(config.cache.tti, None);
        assert_eq!(config.cache.max_capacity, 10_000);
    }

    #[test]
    fn test_init_after_settings_is_rejected() {
        let loaded = settings();
        let custom = Config {
            key_prefix: "late".to_string(),
            ..Config::default()
        };

        let rejected = init(custom.clone()).unwrap_err();

        assert_eq!(rejected, custom);
        assert!(std::ptr::eq(settings(), loaded));
    }
}
