//! Versioned reference index build
//!
//! Reconstructs every OTU named in a manifest at its pinned version, writes the
//! FASTA and export artifacts, drives the bowtie2 index builder, and advances
//! last-indexed bookkeeping. Any failure rolls back files and records.

pub mod compensate;
pub mod context;
pub mod index;
pub mod layout;
pub mod manifest;
pub mod orchestrator;
pub mod reconcile;
pub mod reconstruct;
pub mod state;

pub use compensate::{Compensator, RollbackReport};
pub use context::BuildContext;
pub use index::{generate_index_id, BuildIndex, FileKind, IndexFile, UNBUILT};
pub use layout::{BuildLayout, EXPORT_FILE, FASTA_FILE, INDEX_PREFIX};
pub use manifest::Manifest;
pub use orchestrator::{BuildOrchestrator, BuildReport};
pub use reconcile::{reconcile, restore, PriorIndexed, ReconcileSummary};
pub use reconstruct::HistoryReconstructor;
pub use state::{BuildState, BuildStateMachine, Transition};
