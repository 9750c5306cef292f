use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `logging.level`; `logging.debug_log` always enables CAS protocol logs.
///
/// # Errors
///
/// Invalid filter directives, or a subscriber already installed.
pub fn init(cfg: &LoggingConfig) -> anyhow::Result<()> {
    let mut filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cfg.level))?;
    if cfg.debug_log {
        filter = filter.add_directive("cas_client=debug".parse()?);
    }

    let registry = tracing_subscriber::registry().with(filter);
    if cfg.json {
        registry
            .with(fmt::layer().json().with_target(true).flatten_event(true))
            .try_init()?;
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()?;
    }
    Ok(())
}
