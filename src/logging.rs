//! Tracing subscriber setup for applications embedding the crate.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "method_cache=info";

/// Install a formatting subscriber filtered by `RUST_LOG`.
///
/// # Errors
/// Returns error if a global subscriber is already installed.
pub fn init() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_error() {
        let _ = init();
        assert!(init().is_err());
    }
}
