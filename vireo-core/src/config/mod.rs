//! Configuration types for Vireo

use crate::VireoError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Maximum in-flight history reconstructions (0 = unbounded)
    #[serde(default = "default_reconstruction_concurrency")]
    pub reconstruction_concurrency: usize,
    /// Worker count passed to the external indexer
    #[serde(default = "default_indexer_threads")]
    pub indexer_threads: usize,
    /// Leave the staging directory in place after a successful build
    #[serde(default)]
    pub keep_staging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    #[serde(default = "default_indexer_binary")]
    pub binary: String,
    #[serde(default = "default_indexer_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    /// Root for final reference and index artifacts
    #[serde(default)]
    pub data_dir: Option<String>,
    /// Root for per-build staging directories
    #[serde(default)]
    pub temp_dir: Option<String>,
}

// Default value functions
fn default_reconstruction_concurrency() -> usize { 64 }
fn default_indexer_threads() -> usize { num_cpus::get() }
fn default_indexer_binary() -> String { "bowtie2-build".to_string() }
fn default_indexer_timeout_secs() -> u64 { 3600 }

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            reconstruction_concurrency: default_reconstruction_concurrency(),
            indexer_threads: default_indexer_threads(),
            keep_staging: false,
        }
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            binary: default_indexer_binary(),
            timeout_secs: default_indexer_timeout_secs(),
        }
    }
}

impl IndexerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PathsConfig {
    /// Configured data directory, or the environment-derived default
    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(crate::system::vireo_data_dir)
    }

    /// Configured staging root, or the environment-derived default
    pub fn resolve_temp_dir(&self) -> PathBuf {
        self.temp_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(crate::system::vireo_temp_dir)
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, VireoError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| VireoError::Configuration(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), VireoError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| VireoError::Configuration(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}
