//! On-disk layout of one build
//!
//! Artifacts are written under a staging directory and copied into the final
//! index directory once every stage that produces files has finished.

use crate::index::{FileKind, IndexFile};
use std::path::{Path, PathBuf};
use vireo_bio::DataType;
use vireo_core::error::{VireoError, VireoResult};
use vireo_core::system::{index_dir, staging_dir};
use vireo_tools::BOWTIE2_SUFFIXES;

pub const FASTA_FILE: &str = "reference.fa";
pub const EXPORT_FILE: &str = "reference.json.gz";
/// Output prefix handed to bowtie2-build
pub const INDEX_PREFIX: &str = "reference";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    pub staging: PathBuf,
    pub final_dir: PathBuf,
}

impl BuildLayout {
    pub fn new(staging: impl Into<PathBuf>, final_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging: staging.into(),
            final_dir: final_dir.into(),
        }
    }

    /// Layout for `index_id` under the given staging and data roots
    pub fn for_index(
        staging_root: &Path,
        data_root: &Path,
        reference_id: &str,
        index_id: &str,
    ) -> Self {
        Self::new(
            staging_dir(staging_root, index_id),
            index_dir(data_root, reference_id, index_id),
        )
    }

    pub fn fasta_path(&self) -> PathBuf {
        self.staging.join(FASTA_FILE)
    }

    pub fn export_path(&self) -> PathBuf {
        self.staging.join(EXPORT_FILE)
    }

    pub fn index_prefix(&self) -> PathBuf {
        self.staging.join(INDEX_PREFIX)
    }

    /// Names of every file the build is expected to have produced
    pub fn expected_files(data_type: &DataType) -> Vec<String> {
        let mut names = vec![FASTA_FILE.to_string(), EXPORT_FILE.to_string()];
        if !data_type.is_barcode() {
            names.extend(
                BOWTIE2_SUFFIXES
                    .iter()
                    .map(|suffix| format!("{}{}", INDEX_PREFIX, suffix)),
            );
        }
        names
    }

    pub async fn prepare(&self) -> VireoResult<()> {
        tokio::fs::create_dir_all(&self.staging)
            .await
            .map_err(|e| VireoError::filesystem(&self.staging, e))
    }

    /// Copy every expected artifact from staging into the final directory.
    ///
    /// A missing artifact fails the transfer.
    pub async fn transfer(&self, data_type: &DataType) -> VireoResult<Vec<IndexFile>> {
        tokio::fs::create_dir_all(&self.final_dir)
            .await
            .map_err(|e| VireoError::filesystem(&self.final_dir, e))?;

        let mut files = Vec::new();
        for name in Self::expected_files(data_type) {
            let source = self.staging.join(&name);
            let target = self.final_dir.join(&name);

            let size = tokio::fs::copy(&source, &target)
                .await
                .map_err(|e| VireoError::filesystem(&source, e))?;

            tracing::debug!(file = %name, size, "transferred artifact");
            files.push(IndexFile {
                kind: FileKind::for_name(&name),
                name,
                size,
            });
        }

        Ok(files)
    }

    /// Remove the staging tree. A tree that is already gone counts as removed.
    pub async fn remove_staging(&self) -> VireoResult<bool> {
        remove_tree(&self.staging).await
    }

    pub async fn remove_final(&self) -> VireoResult<bool> {
        remove_tree(&self.final_dir).await
    }
}

async fn remove_tree(path: &Path) -> VireoResult<bool> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(VireoError::filesystem(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn layout(root: &TempDir) -> BuildLayout {
        BuildLayout::for_index(
            &root.path().join("temp"),
            &root.path().join("data"),
            "ref1",
            "idx1",
        )
    }

    #[test]
    fn test_paths() {
        let layout =
            BuildLayout::for_index(Path::new("/tmp/vireo"), Path::new("/data"), "ref1", "idx1");

        assert_eq!(layout.staging, PathBuf::from("/tmp/vireo/idx1"));
        assert_eq!(layout.final_dir, PathBuf::from("/data/references/ref1/idx1"));
        assert_eq!(layout.fasta_path(), PathBuf::from("/tmp/vireo/idx1/reference.fa"));
        assert_eq!(layout.export_path(), PathBuf::from("/tmp/vireo/idx1/reference.json.gz"));
        assert_eq!(layout.index_prefix(), PathBuf::from("/tmp/vireo/idx1/reference"));
    }

    #[test]
    fn test_expected_files() {
        assert_eq!(
            BuildLayout::expected_files(&DataType::Barcode),
            vec!["reference.fa", "reference.json.gz"]
        );

        let genome = BuildLayout::expected_files(&DataType::Genome);
        assert_eq!(genome.len(), 8);
        assert!(genome.contains(&"reference.rev.2.bt2".to_string()));
    }

    #[tokio::test]
    async fn test_transfer_copies_and_records_files() {
        let root = TempDir::new().unwrap();
        let layout = layout(&root);
        layout.prepare().await.unwrap();

        std::fs::write(layout.fasta_path(), ">s1\nACGT\n").unwrap();
        std::fs::write(layout.export_path(), b"gz").unwrap();

        let files = layout.transfer(&DataType::Barcode).await.unwrap();

        assert_eq!(
            files,
            vec![
                IndexFile {
                    name: "reference.fa".to_string(),
                    size: 9,
                    kind: FileKind::Fasta,
                },
                IndexFile {
                    name: "reference.json.gz".to_string(),
                    size: 2,
                    kind: FileKind::Json,
                },
            ]
        );
        assert!(layout.final_dir.join(FASTA_FILE).exists());
    }

    #[tokio::test]
    async fn test_transfer_fails_on_missing_index_part() {
        let root = TempDir::new().unwrap();
        let layout = layout(&root);
        layout.prepare().await.unwrap();

        std::fs::write(layout.fasta_path(), ">s1\nACGT\n").unwrap();
        std::fs::write(layout.export_path(), b"gz").unwrap();

        let err = layout.transfer(&DataType::Genome).await.unwrap_err();
        assert!(matches!(err, VireoError::Filesystem { .. }));
    }

    #[tokio::test]
    async fn test_remove_missing_tree_is_clean() {
        let root = TempDir::new().unwrap();
        let layout = layout(&root);

        assert!(!layout.remove_staging().await.unwrap());

        layout.prepare().await.unwrap();
        assert!(layout.remove_staging().await.unwrap());
        assert!(!layout.staging.exists());
    }
}
