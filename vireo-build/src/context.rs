/// Everything one build needs, passed explicitly to the orchestrator
use crate::manifest::Manifest;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use vireo_core::config::Config;
use vireo_storage::{DocumentStore, HistoryService};
use vireo_tools::{ProcessRunner, Tool};

#[derive(Clone)]
pub struct BuildContext {
    pub store: Arc<dyn DocumentStore>,
    pub history: Arc<dyn HistoryService>,
    pub runner: Arc<dyn ProcessRunner>,
    /// Root under which `<index_id>` staging directories are created
    pub staging_root: PathBuf,
    /// Root under which `references/<ref_id>/<index_id>` is published
    pub data_root: PathBuf,
    pub manifest: Manifest,
    pub reference_id: String,
    /// Identifier reserved by the host; generated when absent
    pub index_id: Option<String>,
    /// Maximum in-flight reconstructions (0 = unbounded)
    pub concurrency: usize,
    pub indexer_threads: usize,
    pub indexer_binary: PathBuf,
    pub indexer_timeout: Duration,
    pub keep_staging: bool,
}

impl BuildContext {
    /// Context with default configuration
    pub fn new(
        store: Arc<dyn DocumentStore>,
        history: Arc<dyn HistoryService>,
        runner: Arc<dyn ProcessRunner>,
        manifest: Manifest,
        reference_id: impl Into<String>,
    ) -> Self {
        Self::with_config(store, history, runner, manifest, reference_id, &Config::default())
    }

    pub fn with_config(
        store: Arc<dyn DocumentStore>,
        history: Arc<dyn HistoryService>,
        runner: Arc<dyn ProcessRunner>,
        manifest: Manifest,
        reference_id: impl Into<String>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            history,
            runner,
            staging_root: config.paths.resolve_temp_dir(),
            data_root: config.paths.resolve_data_dir(),
            manifest,
            reference_id: reference_id.into(),
            index_id: None,
            concurrency: config.build.reconstruction_concurrency,
            indexer_threads: config.build.indexer_threads,
            indexer_binary: resolve_indexer(&config.indexer.binary),
            indexer_timeout: config.indexer.timeout(),
            keep_staging: config.build.keep_staging,
        }
    }

    pub fn with_index_id(mut self, index_id: impl Into<String>) -> Self {
        self.index_id = Some(index_id.into());
        self
    }

    pub fn with_roots(
        mut self,
        staging_root: impl Into<PathBuf>,
        data_root: impl Into<PathBuf>,
    ) -> Self {
        self.staging_root = staging_root.into();
        self.data_root = data_root.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_indexer_threads(mut self, threads: usize) -> Self {
        self.indexer_threads = threads;
        self
    }

    pub fn with_indexer_timeout(mut self, timeout: Duration) -> Self {
        self.indexer_timeout = timeout;
        self
    }

    pub fn with_indexer_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.indexer_binary = binary.into();
        self
    }

    pub fn with_keep_staging(mut self, keep: bool) -> Self {
        self.keep_staging = keep;
        self
    }
}

// An unresolvable binary is left as configured; spawning it reports the failure
fn resolve_indexer(configured: &str) -> PathBuf {
    vireo_tools::locate_tool(Tool::Bowtie2, Some(configured)).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "using configured indexer path as-is");
        PathBuf::from(configured)
    })
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("reference_id", &self.reference_id)
            .field("index_id", &self.index_id)
            .field("manifest", &self.manifest)
            .field("staging_root", &self.staging_root)
            .field("data_root", &self.data_root)
            .field("concurrency", &self.concurrency)
            .field("indexer_binary", &self.indexer_binary)
            .finish_non_exhaustive()
    }
}
