//! Logging setup: `tracing` to stderr, filtered by `RUST_LOG`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default directive; `verbose` raises devstack's own level to debug.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "warn,devstack=debug"
    } else {
        "warn,devstack=info"
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the default.
pub fn init_logging(verbose: bool) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .map_err(|e| format!("cannot initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        for verbose in [false, true] {
            assert!(EnvFilter::try_new(default_filter(verbose)).is_ok());
        }
        assert!(default_filter(true).contains("devstack=debug"));
    }
}
