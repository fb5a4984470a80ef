use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// Cache the paths to avoid repeated environment lookups
static VIREO_HOME: OnceLock<PathBuf> = OnceLock::new();
static VIREO_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();
static VIREO_TEMP_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Get the Vireo home directory
/// Checks VIREO_HOME environment variable, falls back to ${HOME}/.vireo
pub fn vireo_home() -> PathBuf {
    VIREO_HOME
        .get_or_init(|| {
            if let Ok(path) = std::env::var("VIREO_HOME") {
                PathBuf::from(path)
            } else {
                let home = std::env::var("HOME").unwrap_or_else(|_| {
                    std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string())
                });
                PathBuf::from(home).join(".vireo")
            }
        })
        .clone()
}

/// Get the data directory holding references and their indexes
/// Checks VIREO_DATA_DIR environment variable, falls back to VIREO_HOME/data
pub fn vireo_data_dir() -> PathBuf {
    VIREO_DATA_DIR
        .get_or_init(|| {
            if let Ok(path) = std::env::var("VIREO_DATA_DIR") {
                PathBuf::from(path)
            } else {
                vireo_home().join("data")
            }
        })
        .clone()
}

/// Get the root for per-build staging directories
/// Checks VIREO_TEMP_DIR, then $TMPDIR/vireo, falls back to /tmp/vireo
pub fn vireo_temp_dir() -> PathBuf {
    VIREO_TEMP_DIR
        .get_or_init(|| {
            if let Ok(path) = std::env::var("VIREO_TEMP_DIR") {
                PathBuf::from(path)
            } else if let Ok(tmpdir) = std::env::var("TMPDIR") {
                PathBuf::from(tmpdir).join("vireo")
            } else {
                PathBuf::from("/tmp/vireo")
            }
        })
        .clone()
}

/// Returns: <data_dir>/references/<ref_id>
pub fn reference_dir(data_dir: &Path, ref_id: &str) -> PathBuf {
    data_dir.join("references").join(ref_id)
}

/// Final location of a built index
/// Returns: <data_dir>/references/<ref_id>/<index_id>
pub fn index_dir(data_dir: &Path, ref_id: &str, index_id: &str) -> PathBuf {
    reference_dir(data_dir, ref_id).join(index_id)
}

/// Returns: <temp_dir>/<index_id>
pub fn staging_dir(temp_dir: &Path, index_id: &str) -> PathBuf {
    temp_dir.join(index_id)
}
