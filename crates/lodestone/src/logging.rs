//! Logging system setup.
//!
//! Installs a global `tracing` subscriber. `RUST_LOG` takes precedence over
//! the configured level.

use crate::config::LoggingSettings;
use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging system.
///
/// # Panics
///
/// When a global subscriber is already installed. Use
/// [`try_setup_logging`] where that can happen, e.g. in tests.
pub fn setup_logging(settings: &LoggingSettings) {
    let filter = filter(settings);
    if settings.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}

/// Initialize the logging system, failing if a subscriber is already set.
pub fn try_setup_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = filter(settings);
    if settings.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(false))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()?;
    }
    Ok(())
}

fn filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_setup_fails_instead_of_panicking() {
        let settings = LoggingSettings::default();
        // Another test may have installed a subscriber first
        let _ = try_setup_logging(&settings);
        assert!(try_setup_logging(&settings).is_err());
    }
}
