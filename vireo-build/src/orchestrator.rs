//! Build orchestration
//!
//! Drives one build from manifest to a published, ready index. Stages run
//! strictly one after another. A failure in any stage moves the state machine
//! to `RolledBack`, runs the compensator, and surfaces the stage's own error.

use crate::compensate::{Compensator, RollbackReport};
use crate::context::BuildContext;
use crate::index::{generate_index_id, BuildIndex, IndexFile};
use crate::layout::BuildLayout;
use crate::reconcile::{reconcile, ReconcileSummary};
use crate::reconstruct::HistoryReconstructor;
use crate::state::{BuildState, BuildStateMachine};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use vireo_bio::{
    extract_sequences, prepare_export, write_export_snapshot, write_sequence_file, Otu, Reference,
    SequenceOtuMap,
};
use vireo_core::error::{VireoError, VireoResult};
use vireo_storage::Collection;
use vireo_tools::Bowtie2Builder;

/// Projection used when reading the parent reference
const REFERENCE_FIELDS: [&str; 3] = ["data_type", "organism", "targets"];

/// Summary of a successful build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildReport {
    pub index_id: String,
    pub reference_id: String,
    pub otu_count: usize,
    pub sequence_count: usize,
    pub files: Vec<IndexFile>,
    pub reconciled: ReconcileSummary,
    pub index_dir: PathBuf,
}

pub struct BuildOrchestrator {
    ctx: BuildContext,
    index_id: String,
    layout: BuildLayout,
    machine: BuildStateMachine,
    /// Set once bookkeeping has been advanced, so a rollback can revert it
    reconciled: Option<ReconcileSummary>,
    rollback: Option<RollbackReport>,
}

impl BuildOrchestrator {
    pub fn new(ctx: BuildContext) -> Self {
        let index_id = ctx.index_id.clone().unwrap_or_else(generate_index_id);
        let layout = BuildLayout::for_index(
            &ctx.staging_root,
            &ctx.data_root,
            &ctx.reference_id,
            &index_id,
        );

        Self {
            ctx,
            index_id,
            layout,
            machine: BuildStateMachine::new(),
            reconciled: None,
            rollback: None,
        }
    }

    pub fn index_id(&self) -> &str {
        &self.index_id
    }

    pub fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    pub fn state(&self) -> BuildState {
        self.machine.state()
    }

    pub fn state_history(&self) -> Vec<BuildState> {
        self.machine.history()
    }

    /// Outcome of the compensator, present after a failed run
    pub fn rollback_report(&self) -> Option<&RollbackReport> {
        self.rollback.as_ref()
    }

    /// Run the build to `Ready`, or roll it back and return the failure
    pub async fn run(&mut self) -> VireoResult<BuildReport> {
        if self.machine.state() != BuildState::Created {
            return Err(VireoError::InvalidInput(format!(
                "build {} already ran and is {}",
                self.index_id,
                self.machine.state()
            )));
        }

        tracing::info!(
            index_id = %self.index_id,
            reference_id = %self.ctx.reference_id,
            otus = self.ctx.manifest.len(),
            "starting index build"
        );

        match self.execute().await {
            Ok(report) => {
                tracing::info!(
                    index_id = %report.index_id,
                    otus = report.otu_count,
                    sequences = report.sequence_count,
                    files = report.files.len(),
                    "index build ready"
                );
                Ok(report)
            }
            Err(e) => {
                let failed_in = self.machine.state();
                tracing::error!(
                    index_id = %self.index_id,
                    state = %failed_in,
                    category = %e.category(),
                    error = %e,
                    "index build failed, rolling back"
                );

                self.machine.fail();
                let mut compensator = Compensator::new(
                    Arc::clone(&self.ctx.store),
                    self.layout.clone(),
                    &self.index_id,
                );
                if let Some(summary) = self.reconciled.take() {
                    compensator = compensator.with_reconciled(summary);
                }
                self.rollback = Some(compensator.run().await);

                Err(e)
            }
        }
    }

    async fn execute(&mut self) -> VireoResult<BuildReport> {
        let store = Arc::clone(&self.ctx.store);

        let reference: Reference = vireo_storage::fetch(
            store.as_ref(),
            Collection::References,
            &self.ctx.reference_id,
            &REFERENCE_FIELDS,
        )
        .await?
        .ok_or_else(|| VireoError::NotFound(format!("reference {}", self.ctx.reference_id)))?;

        BuildIndex::new(&self.index_id, &self.ctx.reference_id, self.ctx.manifest.clone())
            .reserve(store.as_ref())
            .await?;
        self.layout.prepare().await?;

        self.machine.advance()?;
        let otus = HistoryReconstructor::new(Arc::clone(&self.ctx.history), self.ctx.concurrency)
            .reconstruct(&self.ctx.manifest)
            .await?;
        let otus = Arc::new(otus);

        // Extraction is pulled lazily by the writer, so both stages run together
        self.machine.advance()?;
        self.machine.advance()?;
        let (sequence_count, owners) = self.write_sequences(&otus, &reference).await?;
        BuildIndex::set_sequence_otu_map(store.as_ref(), &self.index_id, &owners).await?;

        self.machine.advance()?;
        let builder = Bowtie2Builder::new(
            self.ctx.indexer_binary.clone(),
            Arc::clone(&self.ctx.runner),
            self.ctx.indexer_timeout,
        );
        builder
            .build(
                &self.layout.fasta_path(),
                &self.layout.index_prefix(),
                &reference.data_type,
                self.ctx.indexer_threads,
            )
            .await?;

        self.machine.advance()?;
        self.write_export(&otus, &reference).await?;
        BuildIndex::set_has_json(store.as_ref(), &self.index_id).await?;

        self.machine.advance()?;
        let files = self.layout.transfer(&reference.data_type).await?;
        BuildIndex::set_files(store.as_ref(), &self.index_id, &files).await?;

        self.machine.advance()?;
        let reconciled = reconcile(store.as_ref(), &self.ctx.reference_id).await?;
        self.reconciled = Some(reconciled.clone());

        BuildIndex::mark_ready(store.as_ref(), &self.index_id).await?;
        self.machine.advance()?;

        if !self.ctx.keep_staging {
            if let Err(e) = self.layout.remove_staging().await {
                tracing::warn!(error = %e, "failed to clean staging directory");
            }
        }

        Ok(BuildReport {
            index_id: self.index_id.clone(),
            reference_id: self.ctx.reference_id.clone(),
            otu_count: otus.len(),
            sequence_count,
            files,
            reconciled,
            index_dir: self.layout.final_dir.clone(),
        })
    }

    async fn write_sequences(
        &self,
        otus: &Arc<Vec<Otu>>,
        reference: &Reference,
    ) -> VireoResult<(usize, SequenceOtuMap)> {
        let otus = Arc::clone(otus);
        let data_type = reference.data_type.clone();
        let path = self.layout.fasta_path();

        let (written, owners) =
            tokio::task::spawn_blocking(move || -> VireoResult<(usize, SequenceOtuMap)> {
                let mut owners = SequenceOtuMap::new();
                let sequences = extract_sequences(otus.iter(), &data_type, &mut owners);
                let written = write_sequence_file(&path, sequences)?;
                Ok((written, owners))
            })
            .await
            .map_err(|e| VireoError::Other(format!("sequence writer task failed: {}", e)))??;

        tracing::info!(
            index_id = %self.index_id,
            sequences = written,
            owners = owners.len(),
            "wrote sequence file"
        );
        Ok((written, owners))
    }

    async fn write_export(&self, otus: &Arc<Vec<Otu>>, reference: &Reference) -> VireoResult<()> {
        let otus = Arc::clone(otus);
        let reference = reference.clone();
        let path = self.layout.export_path();

        tokio::task::spawn_blocking(move || {
            let document = prepare_export(&reference, otus.iter());
            write_export_snapshot(&path, &document)
        })
        .await
        .map_err(|e| VireoError::Other(format!("export writer task failed: {}", e)))?
    }
}
