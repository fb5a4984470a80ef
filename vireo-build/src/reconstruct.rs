//! Concurrent reconstruction of manifest OTUs
//!
//! One task is spawned per manifest entry. A semaphore bounds how many are in
//! flight; a limit of zero leaves fan-out unbounded. Every task runs to
//! completion even after a sibling fails, and the earliest failure observed is
//! the one returned.

use crate::manifest::Manifest;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use vireo_bio::otu::Otu;
use vireo_core::error::{VireoError, VireoResult};
use vireo_storage::{Collection, HistoryService};

pub struct HistoryReconstructor {
    history: Arc<dyn HistoryService>,
    limit: Option<usize>,
}

impl HistoryReconstructor {
    pub fn new(history: Arc<dyn HistoryService>, concurrency: usize) -> Self {
        Self {
            history,
            limit: (concurrency > 0).then_some(concurrency),
        }
    }

    /// Rebuild every manifest OTU at its pinned version.
    ///
    /// Returns one OTU per entry, in manifest order, or the first failure.
    pub async fn reconstruct(&self, manifest: &Manifest) -> VireoResult<Vec<Otu>> {
        let semaphore = self.limit.map(|n| Arc::new(Semaphore::new(n)));

        let mut pending: FuturesUnordered<_> = manifest
            .iter()
            .enumerate()
            .map(|(position, (otu_id, version))| {
                let history = Arc::clone(&self.history);
                let semaphore = semaphore.clone();
                let otu_id = otu_id.to_string();

                let handle = tokio::spawn({
                    let otu_id = otu_id.clone();
                    async move {
                        let _permit = match semaphore {
                            Some(semaphore) => Some(semaphore.acquire_owned().await.map_err(|e| {
                                VireoError::Other(format!("reconstruction limiter closed: {}", e))
                            })?),
                            None => None,
                        };
                        reconstruct_one(history.as_ref(), &otu_id, version).await
                    }
                });

                async move {
                    let result = handle.await.unwrap_or_else(|e| {
                        Err(VireoError::Reconstruction {
                            otu_id,
                            version,
                            reason: format!("task failed: {}", e),
                        })
                    });
                    (position, result)
                }
            })
            .collect();

        let mut slots: Vec<Option<Otu>> = vec![None; manifest.len()];
        let mut first_error = None;

        while let Some((position, result)) = pending.next().await {
            match result {
                Ok(otu) => slots[position] = Some(otu),
                Err(e) => {
                    if first_error.is_none() {
                        tracing::warn!(
                            error = %e,
                            "reconstruction failed, draining remaining tasks"
                        );
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        let otus: Vec<Otu> = slots.into_iter().flatten().collect();
        tracing::info!(otus = otus.len(), "reconstructed manifest");
        Ok(otus)
    }
}

async fn reconstruct_one(
    history: &dyn HistoryService,
    otu_id: &str,
    version: u32,
) -> VireoResult<Otu> {
    let rebuilt = history
        .reconstruct_at_version(Collection::Otus, otu_id, version)
        .await?;

    serde_json::from_value(rebuilt.document).map_err(|e| VireoError::Reconstruction {
        otu_id: otu_id.to_string(),
        version,
        reason: format!("malformed OTU document: {}", e),
    })
}
