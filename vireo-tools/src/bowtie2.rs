//! bowtie2 index builder
//!
//! Runs `bowtie2-build` over a written FASTA file. Barcode references do not
//! receive a mapping index and skip the subprocess entirely.

use crate::process::ProcessRunner;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use vireo_bio::otu::DataType;
use vireo_core::error::{VireoError, VireoResult};

/// Files produced by `bowtie2-build` for a given output prefix
pub const BOWTIE2_SUFFIXES: [&str; 6] = [
    ".1.bt2",
    ".2.bt2",
    ".3.bt2",
    ".4.bt2",
    ".rev.1.bt2",
    ".rev.2.bt2",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBuildOutcome {
    /// Barcode reference, no subprocess was run
    Skipped,
    /// Subprocess exited cleanly; paths the index parts are expected at
    Built { files: Vec<PathBuf> },
}

pub struct Bowtie2Builder {
    binary: PathBuf,
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
}

impl Bowtie2Builder {
    pub fn new(
        binary: impl Into<PathBuf>,
        runner: Arc<dyn ProcessRunner>,
        timeout: Duration,
    ) -> Self {
        Self {
            binary: binary.into(),
            runner,
            timeout,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Arguments after the program name
    pub fn build_args(fasta: &Path, prefix: &Path, threads: usize) -> Vec<String> {
        vec![
            "--threads".to_string(),
            threads.max(1).to_string(),
            fasta.display().to_string(),
            prefix.display().to_string(),
        ]
    }

    /// The six index part paths for `prefix`
    pub fn index_files(prefix: &Path) -> Vec<PathBuf> {
        BOWTIE2_SUFFIXES
            .iter()
            .map(|suffix| {
                let mut name = OsString::from(prefix.as_os_str());
                name.push(suffix);
                PathBuf::from(name)
            })
            .collect()
    }

    /// Build the index rooted at `prefix` from `fasta`.
    ///
    /// The exit code is the only success signal; output is kept for
    /// diagnostics.
    pub async fn build(
        &self,
        fasta: &Path,
        prefix: &Path,
        data_type: &DataType,
        threads: usize,
    ) -> VireoResult<IndexBuildOutcome> {
        if data_type.is_barcode() {
            tracing::info!("barcode reference, skipping bowtie2 index build");
            return Ok(IndexBuildOutcome::Skipped);
        }

        let args = Self::build_args(fasta, prefix, threads);
        tracing::info!(
            binary = %self.binary.display(),
            threads,
            prefix = %prefix.display(),
            "running bowtie2-build"
        );

        let output = self.runner.run(&self.binary, &args, self.timeout).await?;
        tracing::debug!(stdout = %output.stdout, stderr = %output.stderr, "bowtie2-build finished");

        if !output.success() {
            let code = output
                .code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(VireoError::Indexer(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                code,
                output.stderr.trim()
            )));
        }

        Ok(IndexBuildOutcome::Built {
            files: Self::index_files(prefix),
        })
    }
}
