//! External tool integration
//!
//! Wraps the bowtie2 index builder behind a subprocess runner seam so the
//! build can be driven against real binaries or scripted stand-ins.

pub mod bowtie2;
pub mod process;
pub mod types;

// Re-exports for convenience
pub use bowtie2::{Bowtie2Builder, IndexBuildOutcome, BOWTIE2_SUFFIXES};
pub use process::{ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use types::{locate_tool, Tool};
