//! Test environment management
//!
//! Provides isolated data and staging roots with automatic cleanup using RAII.
//! Nothing here touches process environment variables, so tests can run in
//! parallel.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vireo_core::config::Config;

pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::with_prefix("vireo-test")
            .context("Failed to create temporary directory")?;

        std::fs::create_dir_all(temp_dir.path().join("data"))?;
        std::fs::create_dir_all(temp_dir.path().join("temp"))?;

        Ok(Self { temp_dir })
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Root the final `references/<ref>/<index>` trees are published under
    pub fn data_root(&self) -> PathBuf {
        self.root().join("data")
    }

    /// Root the per-build staging directories are created under
    pub fn staging_root(&self) -> PathBuf {
        self.root().join("temp")
    }

    pub fn staging_dir(&self, index_id: &str) -> PathBuf {
        vireo_core::staging_dir(&self.staging_root(), index_id)
    }

    pub fn index_dir(&self, reference_id: &str, index_id: &str) -> PathBuf {
        vireo_core::index_dir(&self.data_root(), reference_id, index_id)
    }

    /// Default configuration pointed at this environment's roots
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.paths.data_dir = Some(self.data_root().to_string_lossy().into_owned());
        config.paths.temp_dir = Some(self.staging_root().to_string_lossy().into_owned());
        config.build.indexer_threads = 2;
        config
    }

    /// Write a file relative to the environment root
    pub fn write_file(&self, relative: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// File names directly inside `dir`, sorted; empty when it does not exist
    pub fn list_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
