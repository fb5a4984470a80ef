//! Core error types for Vireo

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Vireo operations
#[derive(Error, Debug)]
pub enum VireoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to reconstruct OTU {otu_id} at version {version}: {reason}")]
    Reconstruction {
        otu_id: String,
        version: u32,
        reason: String,
    },

    #[error("Indexer error: {0}")]
    Indexer(String),

    #[error("Indexer {program} timed out after {seconds}s")]
    IndexerTimeout { program: String, seconds: u64 },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Parsing error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias for Vireo operations
pub type VireoResult<T> = Result<T, VireoError>;

/// Coarse failure buckets used when logging build failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Reconstruction,
    Indexer,
    StoreWrite,
    Filesystem,
    Other,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::Reconstruction => "reconstruction",
            ErrorCategory::Indexer => "indexer",
            ErrorCategory::StoreWrite => "store_write",
            ErrorCategory::Filesystem => "filesystem",
            ErrorCategory::Other => "other",
        };
        f.write_str(name)
    }
}

impl VireoError {
    /// Wrap an IO error with the path it happened on
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VireoError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            VireoError::Reconstruction { .. } => ErrorCategory::Reconstruction,
            VireoError::Indexer(_) | VireoError::IndexerTimeout { .. } => ErrorCategory::Indexer,
            VireoError::Store(_) => ErrorCategory::StoreWrite,
            VireoError::Io(_) | VireoError::Filesystem { .. } | VireoError::Path(_) => {
                ErrorCategory::Filesystem
            }
            _ => ErrorCategory::Other,
        }
    }

    /// True when the error reports a path that does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            VireoError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            VireoError::Filesystem { source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            VireoError::NotFound(_) => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for VireoError {
    fn from(err: serde_json::Error) -> Self {
        VireoError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for VireoError {
    fn from(err: anyhow::Error) -> Self {
        VireoError::Other(err.to_string())
    }
}
