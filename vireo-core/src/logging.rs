//! Logging bootstrap

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `VIREO_LOG` takes precedence over `RUST_LOG`; `default_level` applies when
/// neither is set. Safe to call more than once.
pub fn init_logging(default_level: &str) {
    let filter = std::env::var("VIREO_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging("warn");
        init_logging("debug");
        tracing::info!("logging initialized twice without panicking");
    }
}
