//! Common types for tool management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vireo_core::error::{VireoError, VireoResult};

/// External tools the build can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tool {
    Bowtie2,
}

impl Tool {
    /// Get the name of the tool
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Bowtie2 => "bowtie2",
        }
    }

    /// Get the display name of the tool
    pub fn display_name(&self) -> &'static str {
        match self {
            Tool::Bowtie2 => "Bowtie 2",
        }
    }

    /// Get the binary name for the index builder
    pub fn binary_name(&self) -> &'static str {
        match self {
            Tool::Bowtie2 => "bowtie2-build",
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Tool {
    type Err = VireoError;

    fn from_str(s: &str) -> VireoResult<Self> {
        match s.to_lowercase().as_str() {
            "bowtie2" | "bowtie2-build" => Ok(Tool::Bowtie2),
            _ => Err(VireoError::InvalidInput(format!("Unknown tool: {}", s))),
        }
    }
}

/// Resolve the binary for `tool`.
///
/// A configured value containing a path separator is used as-is when it
/// exists; otherwise it is looked up on `PATH`.
pub fn locate_tool(tool: Tool, configured: Option<&str>) -> VireoResult<PathBuf> {
    let name = configured.unwrap_or(tool.binary_name());
    let candidate = Path::new(name);

    if candidate.components().count() > 1 {
        return if candidate.exists() {
            Ok(candidate.to_path_buf())
        } else {
            Err(VireoError::NotFound(format!(
                "{} binary not found at {}",
                tool,
                candidate.display()
            )))
        };
    }

    which::which(name)
        .map_err(|e| VireoError::NotFound(format!("{} binary {} not on PATH: {}", tool, name, e)))
}
