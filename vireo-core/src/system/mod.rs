pub mod paths;

// Re-export commonly used functions
pub use paths::{
    index_dir, reference_dir, staging_dir, vireo_data_dir, vireo_home, vireo_temp_dir,
};
