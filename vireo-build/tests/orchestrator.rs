//! End-to-end build scenarios against in-memory collaborators

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use vireo_bio::{read_export_snapshot, read_sequence_file, DataType, ExportDocument, Otu};
use vireo_build::{
    BuildContext, BuildIndex, BuildOrchestrator, BuildState, Manifest, ReconcileSummary,
};
use vireo_core::error::VireoError;
use vireo_storage::{Collection, DocumentStore, MemoryStore, SnapshotHistory};
use vireo_test::{
    init_test_logging, isolate, pin_history, seed_otus, seed_reference, sequence, FaultyStore,
    OtuBuilder, ScriptedHistory, ScriptedRunner, StoreOperation, TestEnvironment,
};

const REFERENCE: &str = "ref1";
const INDEX: &str = "idx1";

struct Harness {
    env: TestEnvironment,
    store: Arc<MemoryStore>,
    history: Arc<ScriptedHistory>,
    runner: Arc<ScriptedRunner>,
}

impl Harness {
    fn new(data_type: &str, otus: &[Otu]) -> Self {
        Self::scripted(data_type, otus, ScriptedRunner::succeeding(), |history| history)
    }

    fn scripted(
        data_type: &str,
        otus: &[Otu],
        runner: ScriptedRunner,
        configure: impl FnOnce(ScriptedHistory) -> ScriptedHistory,
    ) -> Self {
        init_test_logging();

        let env = TestEnvironment::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let snapshots = SnapshotHistory::new();

        seed_reference(&store, REFERENCE, data_type).unwrap();
        seed_otus(&store, &snapshots, otus).unwrap();
        let pinned: Vec<(&str, u32)> = otus.iter().map(|o| (o.id.as_str(), o.version)).collect();
        pin_history(&store, INDEX, &pinned).unwrap();

        Self {
            env,
            store,
            history: Arc::new(configure(ScriptedHistory::new(snapshots))),
            runner: Arc::new(runner),
        }
    }

    fn context(&self, manifest: Manifest) -> BuildContext {
        self.context_with_store(self.store.clone(), manifest)
    }

    fn context_with_store(
        &self,
        store: Arc<dyn DocumentStore>,
        manifest: Manifest,
    ) -> BuildContext {
        BuildContext::with_config(
            store,
            self.history.clone(),
            self.runner.clone(),
            manifest,
            REFERENCE,
            &self.env.config(),
        )
        .with_index_id(INDEX)
        .with_indexer_binary("bowtie2-build")
    }

    fn otu_field(&self, otu_id: &str, field: &str) -> Value {
        self.store
            .document(Collection::Otus, otu_id)
            .and_then(|doc| doc.get(field).cloned())
            .unwrap_or(Value::Null)
    }

    fn history_markers(&self) -> Vec<Value> {
        self.store
            .documents(Collection::History)
            .into_iter()
            .map(|doc| doc["index"].clone())
            .collect()
    }

    fn assert_rolled_back(&self, orchestrator: &BuildOrchestrator) {
        assert_eq!(orchestrator.state(), BuildState::RolledBack);
        assert_eq!(self.store.count(Collection::Indexes), 0);
        assert!(!self.env.staging_dir(INDEX).exists());
        assert!(!self.env.index_dir(REFERENCE, INDEX).exists());
        for marker in self.history_markers() {
            assert_eq!(marker, json!({"id": "unbuilt", "version": "unbuilt"}));
        }
    }
}

/// A at version 2: default isolate with two sequences plus an empty isolate.
/// B at version 1: one default isolate with one sequence.
fn genome_otus() -> Vec<Otu> {
    vec![
        OtuBuilder::new("A")
            .version(2)
            .last_indexed(1)
            .reference(REFERENCE)
            .isolate_with("A_i1", true, 2)
            .isolate(isolate("A_i2", false, Vec::new()))
            .build(),
        OtuBuilder::new("B")
            .version(1)
            .reference(REFERENCE)
            .isolate_with("B_i1", true, 1)
            .build(),
    ]
}

fn genome_manifest() -> Manifest {
    Manifest::new().with("A", 2).with("B", 1)
}

#[tokio::test]
async fn test_genome_build_end_to_end() {
    let harness = Harness::new("genome", &genome_otus());
    let mut orchestrator = BuildOrchestrator::new(harness.context(genome_manifest()));

    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.index_id, INDEX);
    assert_eq!(report.otu_count, 2);
    assert_eq!(report.sequence_count, 3);
    assert_eq!(report.files.len(), 8);
    assert_eq!((report.reconciled.groups, report.reconciled.updated), (2, 2));
    assert_eq!(orchestrator.state(), BuildState::Ready);
    assert_eq!(
        orchestrator.state_history(),
        vec![
            BuildState::Created,
            BuildState::Reconstructing,
            BuildState::Extracting,
            BuildState::Writing,
            BuildState::Indexing,
            BuildState::Exporting,
            BuildState::Uploading,
            BuildState::Reconciling,
            BuildState::Ready,
        ]
    );

    let index_dir = harness.env.index_dir(REFERENCE, INDEX);
    assert_eq!(report.index_dir, index_dir);
    let records = read_sequence_file(index_dir.join("reference.fa")).unwrap();
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["A_i1_s1", "A_i1_s2", "B_i1_s1"]);
    assert_eq!(
        TestEnvironment::list_files(&index_dir),
        vec![
            "reference.1.bt2",
            "reference.2.bt2",
            "reference.3.bt2",
            "reference.4.bt2",
            "reference.fa",
            "reference.json.gz",
            "reference.rev.1.bt2",
            "reference.rev.2.bt2",
        ]
    );

    let record = BuildIndex::load(harness.store.as_ref(), INDEX).await.unwrap().unwrap();
    assert!(record.ready);
    assert!(record.has_json);
    assert_eq!(record.sequence_otu_map.len(), 3);
    assert_eq!(record.sequence_otu_map.get("B_i1_s1"), Some("B"));
    assert_eq!(record.files, report.files);

    let export: ExportDocument = read_export_snapshot(index_dir.join("reference.json.gz")).unwrap();
    assert_eq!(export.data_type, DataType::Genome);
    assert_eq!(export.organism, "virus");
    assert_eq!(export.otus.len(), 2);

    let invocations = harness.runner.invocations();
    assert_eq!(invocations.len(), 1);
    let staging = harness.env.staging_dir(INDEX);
    assert_eq!(
        invocations[0].args,
        vec![
            "--threads".to_string(),
            "2".to_string(),
            staging.join("reference.fa").display().to_string(),
            staging.join("reference").display().to_string(),
        ]
    );
    assert!(!staging.exists());

    assert_eq!(harness.otu_field("A", "last_indexed_version"), json!(2));
    assert_eq!(harness.otu_field("B", "last_indexed_version"), json!(1));
    for marker in harness.history_markers() {
        assert_eq!(marker["id"], json!(INDEX));
    }
}

#[tokio::test]
async fn test_barcode_build_skips_indexer() {
    let otus = vec![OtuBuilder::new("C")
        .version(1)
        .reference(REFERENCE)
        .isolate_with("C_i1", true, 1)
        .isolate_with("C_i2", false, 2)
        .build()];
    let harness = Harness::new("barcode", &otus);

    let report = BuildOrchestrator::new(harness.context(Manifest::new().with("C", 1)))
        .run()
        .await
        .unwrap();

    assert_eq!(harness.runner.call_count(), 0);
    assert_eq!(report.sequence_count, 3);
    let index_dir = harness.env.index_dir(REFERENCE, INDEX);
    assert_eq!(
        TestEnvironment::list_files(&index_dir),
        vec!["reference.fa", "reference.json.gz"]
    );

    let export: ExportDocument = read_export_snapshot(index_dir.join("reference.json.gz")).unwrap();
    assert_eq!(export.data_type, DataType::Barcode);
    assert_eq!(export.targets.map(|t| t.len()), Some(1));
}

#[tokio::test]
async fn test_indexer_exit_code_rolls_back() {
    let harness = Harness::scripted(
        "genome",
        &genome_otus(),
        ScriptedRunner::failing(1, "Error: Encountered internal Bowtie 2 exception"),
        |history| history,
    );
    let mut orchestrator = BuildOrchestrator::new(harness.context(genome_manifest()));

    let err = orchestrator.run().await.unwrap_err();

    match err {
        VireoError::Indexer(msg) => assert!(msg.contains("exited with 1")),
        other => panic!("expected Indexer error, got {:?}", other),
    }
    harness.assert_rolled_back(&orchestrator);

    let report = orchestrator.rollback_report().unwrap();
    assert!(report.is_clean());
    assert!(report.index_deleted);
    assert_eq!(report.history_reset, 2);

    assert_eq!(harness.otu_field("A", "last_indexed_version"), json!(1));
    assert_eq!(harness.otu_field("B", "last_indexed_version"), Value::Null);
}

#[tokio::test]
async fn test_indexer_timeout_rolls_back() {
    let harness = Harness::scripted(
        "genome",
        &genome_otus(),
        ScriptedRunner::succeeding().with_delay(Duration::from_secs(10)),
        |history| history,
    );
    let ctx = harness
        .context(genome_manifest())
        .with_indexer_timeout(Duration::from_millis(50));
    let mut orchestrator = BuildOrchestrator::new(ctx);

    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, VireoError::IndexerTimeout { .. }));
    harness.assert_rolled_back(&orchestrator);
}

#[tokio::test]
async fn test_reconstruction_failure_rolls_back() {
    let harness = Harness::scripted(
        "genome",
        &genome_otus(),
        ScriptedRunner::succeeding(),
        |history| history.fail_on("B", 1),
    );
    let mut orchestrator = BuildOrchestrator::new(harness.context(genome_manifest()));

    let err = orchestrator.run().await.unwrap_err();

    match err {
        VireoError::Reconstruction { otu_id, version, .. } => {
            assert_eq!(otu_id, "B");
            assert_eq!(version, 1);
        }
        other => panic!("expected Reconstruction error, got {:?}", other),
    }
    assert_eq!(harness.history.calls(), 2);
    assert_eq!(harness.runner.call_count(), 0);
    harness.assert_rolled_back(&orchestrator);
}

#[tokio::test]
async fn test_otu_without_default_isolate_contributes_no_sequences() {
    let mut otus = genome_otus();
    otus.push(
        OtuBuilder::new("D")
            .version(4)
            .reference(REFERENCE)
            .isolate(isolate("D_i1", false, vec![sequence("D_s1", "GGGG")]))
            .build(),
    );
    let harness = Harness::new("genome", &otus);

    let report = BuildOrchestrator::new(harness.context(genome_manifest().with("D", 4)))
        .run()
        .await
        .unwrap();

    assert_eq!(report.otu_count, 3);
    assert_eq!(report.sequence_count, 3);

    let record = BuildIndex::load(harness.store.as_ref(), INDEX).await.unwrap().unwrap();
    assert_eq!(record.sequence_otu_map.len(), 4);
    assert_eq!(record.sequence_otu_map.get("D_s1"), Some("D"));
}

#[tokio::test]
async fn test_second_build_reconciles_nothing() {
    let harness = Harness::new("genome", &genome_otus());

    let first = BuildOrchestrator::new(harness.context(genome_manifest()))
        .run()
        .await
        .unwrap();
    let second = BuildOrchestrator::new(harness.context(genome_manifest()).with_index_id("idx2"))
        .run()
        .await
        .unwrap();

    assert_eq!(first.reconciled.updated, 2);
    assert_eq!(second.reconciled, ReconcileSummary::default());
    assert_eq!(harness.store.count(Collection::Indexes), 2);
}

#[tokio::test]
async fn test_rollback_failure_keeps_original_error() {
    let harness = Harness::scripted(
        "genome",
        &genome_otus(),
        ScriptedRunner::failing(1, "bad input"),
        |history| history,
    );
    let store = Arc::new(
        FaultyStore::new(harness.store.clone())
            .fail_on(StoreOperation::DeleteOne, Collection::Indexes),
    );
    let mut orchestrator =
        BuildOrchestrator::new(harness.context_with_store(store, genome_manifest()));

    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, VireoError::Indexer(_)));
    assert_eq!(orchestrator.state(), BuildState::RolledBack);

    let report = orchestrator.rollback_report().unwrap();
    assert!(!report.index_deleted);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.history_reset, 2);
    assert!(!harness.env.staging_dir(INDEX).exists());

    let record = BuildIndex::load(harness.store.as_ref(), INDEX).await.unwrap().unwrap();
    assert!(!record.ready);
}

#[tokio::test]
async fn test_ready_write_failure_rolls_back() {
    let harness = Harness::new("genome", &genome_otus());
    // The map, has_json and files updates go through; marking ready does not
    let store = Arc::new(
        FaultyStore::new(harness.store.clone())
            .fail_after(StoreOperation::UpdateOne, Collection::Indexes, 3),
    );
    let mut orchestrator =
        BuildOrchestrator::new(harness.context_with_store(store, genome_manifest()));

    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, VireoError::Store(_)));
    harness.assert_rolled_back(&orchestrator);

    // Bookkeeping advanced during reconciliation is put back
    assert_eq!(harness.otu_field("A", "last_indexed_version"), json!(1));
    assert_eq!(harness.otu_field("B", "last_indexed_version"), Value::Null);
    let report = orchestrator.rollback_report().unwrap();
    assert!(report.is_clean());
    assert_eq!(report.versions_restored, 2);
}

#[tokio::test]
async fn test_rebuild_after_ready_failure_reconciles_again() {
    let harness = Harness::new("genome", &genome_otus());
    let store = Arc::new(
        FaultyStore::new(harness.store.clone())
            .fail_after(StoreOperation::UpdateOne, Collection::Indexes, 3),
    );
    BuildOrchestrator::new(harness.context_with_store(store, genome_manifest()))
        .run()
        .await
        .unwrap_err();

    let report = BuildOrchestrator::new(harness.context(genome_manifest()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.reconciled.updated, 2);
    assert_eq!(harness.otu_field("A", "last_indexed_version"), json!(2));
    assert_eq!(harness.otu_field("B", "last_indexed_version"), json!(1));
}

#[tokio::test]
async fn test_reconstruction_fan_out_is_bounded() {
    let otus: Vec<Otu> = (0..24)
        .map(|n| {
            OtuBuilder::new(&format!("otu{}", n))
                .version(1)
                .reference(REFERENCE)
                .isolate_with(&format!("otu{}_i", n), true, 1)
                .build()
        })
        .collect();
    let manifest: Manifest = otus.iter().map(|o| (o.id.clone(), o.version)).collect();
    let harness = Harness::scripted(
        "genome",
        &otus,
        ScriptedRunner::succeeding(),
        |history| history.with_delay(Duration::from_millis(10)),
    );

    let report = BuildOrchestrator::new(harness.context(manifest).with_concurrency(4))
        .run()
        .await
        .unwrap();

    assert_eq!(report.otu_count, 24);
    assert_eq!(harness.history.calls(), 24);
    assert!(harness.history.max_in_flight() <= 4);
}

#[tokio::test]
async fn test_reuses_host_reserved_record() {
    let harness = Harness::new("genome", &genome_otus());
    BuildIndex::new(INDEX, REFERENCE, genome_manifest())
        .reserve(harness.store.as_ref())
        .await
        .unwrap();

    BuildOrchestrator::new(harness.context(genome_manifest()))
        .run()
        .await
        .unwrap();

    assert_eq!(harness.store.count(Collection::Indexes), 1);
    let record = BuildIndex::load(harness.store.as_ref(), INDEX).await.unwrap().unwrap();
    assert!(record.ready);
}

#[tokio::test]
async fn test_keep_staging_leaves_artifacts() {
    let harness = Harness::new("genome", &genome_otus());

    BuildOrchestrator::new(harness.context(genome_manifest()).with_keep_staging(true))
        .run()
        .await
        .unwrap();

    assert!(harness.env.staging_dir(INDEX).join("reference.fa").exists());
}

#[tokio::test]
async fn test_missing_reference_rolls_back() {
    let harness = Harness::new("genome", &genome_otus());
    let mut ctx = harness.context(genome_manifest());
    ctx.reference_id = "nope".to_string();
    let mut orchestrator = BuildOrchestrator::new(ctx);

    let err = orchestrator.run().await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(orchestrator.state(), BuildState::RolledBack);
    assert_eq!(harness.store.count(Collection::Indexes), 0);
    assert_eq!(harness.history.calls(), 0);
}

#[tokio::test]
async fn test_orchestrator_runs_once() {
    let harness = Harness::new("genome", &genome_otus());
    let mut orchestrator = BuildOrchestrator::new(harness.context(genome_manifest()));

    orchestrator.run().await.unwrap();
    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, VireoError::InvalidInput(_)));
    assert_eq!(orchestrator.state(), BuildState::Ready);
}

#[tokio::test]
async fn test_generated_index_id() {
    let harness = Harness::new("genome", &genome_otus());
    let mut ctx = harness.context(genome_manifest());
    ctx.index_id = None;
    let mut orchestrator = BuildOrchestrator::new(ctx);
    let index_id = orchestrator.index_id().to_string();

    let report = orchestrator.run().await.unwrap();

    assert_eq!(index_id.len(), 8);
    assert_eq!(report.index_id, index_id);
    assert!(harness.env.index_dir(REFERENCE, &index_id).join("reference.fa").exists());
}
