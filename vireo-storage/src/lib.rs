//! Store and history contracts consumed by the index build
//!
//! The build treats both collaborators as opaque: a collection store offering
//! point reads, filtered scans, conditional updates and grouping, and a history
//! service that rebuilds a record at an earlier version.

pub mod document;
pub mod history;
pub mod memory;
pub mod store;

// Re-export commonly used types and traits
pub use document::{Collection, Condition, Filter, Group, GroupQuery, Patch, UpdateResult};
pub use history::{HistoryService, Reconstruction, SnapshotHistory};
pub use memory::MemoryStore;
pub use store::{fetch, fetch_all, DocumentStore, DocumentStream, GroupStream};
