//! Rollback of a failed build
//!
//! Every action is attempted even when an earlier one fails. Failures are
//! logged and collected in the report, never returned, so the error that
//! triggered the rollback stays the one the caller sees.

use crate::index::BuildIndex;
use crate::layout::BuildLayout;
use crate::reconcile::{restore, ReconcileSummary};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vireo_core::error::VireoResult;
use vireo_storage::DocumentStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    pub index_deleted: bool,
    /// Directories that existed and were removed
    pub removed_dirs: Vec<PathBuf>,
    /// History entries pointed back at the unbuilt marker
    pub history_reset: u64,
    /// OTUs whose `last_indexed_version` was put back
    pub versions_restored: u64,
    /// Descriptions of actions that could not be completed
    pub failures: Vec<String>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Compensator {
    store: Arc<dyn DocumentStore>,
    layout: BuildLayout,
    index_id: String,
    reconciled: Option<ReconcileSummary>,
}

impl Compensator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        layout: BuildLayout,
        index_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            layout,
            index_id: index_id.into(),
            reconciled: None,
        }
    }

    /// Also revert the bookkeeping a completed reconcile advanced
    pub fn with_reconciled(mut self, summary: ReconcileSummary) -> Self {
        self.reconciled = Some(summary);
        self
    }

    pub async fn run(&self) -> RollbackReport {
        let mut report = RollbackReport::default();
        let index_id = self.index_id.as_str();

        match BuildIndex::delete(self.store.as_ref(), index_id).await {
            Ok(deleted) => report.index_deleted = deleted,
            Err(e) => {
                tracing::error!(index_id, error = %e, "failed to delete index record");
                report.failures.push(format!("delete index record: {}", e));
            }
        }

        let staging = self.layout.remove_staging().await;
        record_removal(&mut report, "staging", &self.layout.staging, staging);
        let published = self.layout.remove_final().await;
        record_removal(&mut report, "final", &self.layout.final_dir, published);

        match BuildIndex::reset_history(self.store.as_ref(), index_id).await {
            Ok(result) => report.history_reset = result.modified,
            Err(e) => {
                tracing::error!(index_id, error = %e, "failed to reset history entries");
                report.failures.push(format!("reset history: {}", e));
            }
        }

        if let Some(summary) = &self.reconciled {
            match restore(self.store.as_ref(), summary).await {
                Ok(restored) => report.versions_restored = restored,
                Err(e) => {
                    tracing::error!(
                        index_id,
                        error = %e,
                        "failed to restore last indexed versions"
                    );
                    report.failures.push(format!("restore last indexed versions: {}", e));
                }
            }
        }

        tracing::info!(
            index_id,
            index_deleted = report.index_deleted,
            removed_dirs = report.removed_dirs.len(),
            history_reset = report.history_reset,
            versions_restored = report.versions_restored,
            failures = report.failures.len(),
            "rollback finished"
        );

        report
    }
}

fn record_removal(
    report: &mut RollbackReport,
    label: &str,
    path: &Path,
    removal: VireoResult<bool>,
) {
    match removal {
        Ok(true) => report.removed_dirs.push(path.to_path_buf()),
        Ok(false) => {
            tracing::debug!(path = %path.display(), "{} directory already absent", label)
        }
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "failed to remove {} directory",
                label
            );
            report.failures.push(format!("remove {} directory: {}", label, e));
        }
    }
}
