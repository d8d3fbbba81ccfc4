//! Logging initialization built on the `tracing` ecosystem

use crate::config::LoggingConfig;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber from configuration.
///
/// `RUST_LOG` overrides the configured level when set. Call once per
/// process; a second call returns an error from the subscriber.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match config.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_not_reentrant() {
        let config = LoggingConfig::default();
        // First call may or may not win depending on test ordering, but
        // the second call in the same process must fail cleanly.
        let _ = init(&config);
        assert!(init(&config).is_err());
    }
}
