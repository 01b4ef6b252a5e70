//! Tracing subscriber setup for hosts embedding the core.

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured filter.
pub const LOG_ENV: &str = "POMOFLOW_LOG";

/// Install a global fmt subscriber.
///
/// `POMOFLOW_LOG` wins over `filter` when set and valid; an unparsable
/// `filter` falls back to `info`. Returns `false` if a global subscriber
/// was already installed, so calling this more than once is harmless.
pub fn init_tracing(filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(resolve_filter(filter))
        .try_init()
        .is_ok()
}

fn resolve_filter(filter: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
