//! Vireo: versioned reference index builds
//!
//! Rebuilds every OTU named in a manifest at its pinned version, writes the
//! reference FASTA and gzip JSON export, runs `bowtie2-build`, and advances
//! last-indexed bookkeeping. A failed build is rolled back completely.
//!
//! The workspace crates are re-exported under short module names:
//!
//! ```no_run
//! use std::sync::Arc;
//! use vireo::build::{BuildContext, BuildOrchestrator, Manifest};
//! use vireo::storage::{MemoryStore, SnapshotHistory};
//! use vireo::tools::TokioProcessRunner;
//!
//! # async fn run() -> vireo::VireoResult<()> {
//! let ctx = BuildContext::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(SnapshotHistory::new()),
//!     Arc::new(TokioProcessRunner::new()),
//!     Manifest::from_json(r#"{"A": 2, "B": 1}"#)?,
//!     "reference-1",
//! );
//! let report = BuildOrchestrator::new(ctx).run().await?;
//! println!("index {} is ready", report.index_id);
//! # Ok(())
//! # }
//! ```

pub use vireo_bio as bio;
pub use vireo_build as build;
pub use vireo_core as core;
pub use vireo_storage as storage;
pub use vireo_tools as tools;

pub use vireo_build::{BuildContext, BuildOrchestrator, BuildReport, Manifest};
pub use vireo_core::{init_logging, load_config, Config, VireoError, VireoResult};
