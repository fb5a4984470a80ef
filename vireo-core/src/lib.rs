//! Core utilities and types shared across all Vireo crates

pub mod config;
pub mod error;
pub mod logging;
pub mod system;

// Re-export commonly used types
pub use config::{load_config, save_config, Config};
pub use error::{ErrorCategory, VireoError, VireoResult};
pub use logging::init_logging;

// Re-export system utilities
pub use system::{
    index_dir, reference_dir, staging_dir, vireo_data_dir, vireo_home, vireo_temp_dir,
};

/// Version information for the Vireo project
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
