//! Test utilities for the Vireo workspace
//!
//! Shared fixtures and scripted collaborators for exercising index builds
//! without a real document store, history service or bowtie2 install.
//!
//! - **Test Environment**: temporary data and staging roots with automatic cleanup
//! - **Fixtures**: OTU builders and store/history seeding helpers
//! - **Mock Implementations**: scripted subprocess runner, fault-injecting store
//!   and history

pub mod environment;
pub mod fixtures;
pub mod mock;

// Re-export commonly used items
pub use environment::TestEnvironment;
pub use fixtures::{
    isolate, pin_history, sample_reference, seed_otus, seed_reference, sequence, OtuBuilder,
};
pub use mock::{FaultyStore, ScriptedHistory, ScriptedRunner, StoreOperation};

// Re-export test dependencies for convenience
pub use anyhow::{Context, Result};
pub use tempfile;

/// Initialize test logging (call once per test module)
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Run a test with a clean environment
///
/// # Example
/// ```rust
/// use vireo_test::with_test_env;
///
/// with_test_env(|env| {
///     assert!(env.data_root().exists());
///     Ok(())
/// })
/// .unwrap();
/// ```
pub fn with_test_env<F, R>(f: F) -> Result<R>
where
    F: FnOnce(&TestEnvironment) -> Result<R>,
{
    let env = TestEnvironment::new()?;
    f(&env)
}
