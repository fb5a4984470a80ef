//! Test fixtures and data generators
//!
//! Builders for OTU records plus helpers that seed a [`MemoryStore`] and a
//! [`SnapshotHistory`] consistently.

use serde_json::{json, Value};
use vireo_bio::{Isolate, Otu, ReferenceLink, RemoteId, Sequence};
use vireo_core::error::VireoResult;
use vireo_storage::{Collection, MemoryStore, SnapshotHistory};

pub fn sequence(id: &str, residues: &str) -> Sequence {
    let mut sequence = Sequence::new(id, residues);
    sequence.accession = format!("ACC_{}", id);
    sequence.definition = format!("{} test sequence", id);
    sequence.host = "Test host".to_string();
    sequence
}

pub fn isolate(id: &str, default: bool, sequences: Vec<Sequence>) -> Isolate {
    Isolate {
        id: id.to_string(),
        source_type: "isolate".to_string(),
        source_name: id.to_string(),
        default,
        sequences,
    }
}

/// Builder for OTU records
#[derive(Debug, Clone)]
pub struct OtuBuilder {
    otu: Otu,
}

impl OtuBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            otu: Otu {
                id: id.to_string(),
                name: format!("{} virus", id),
                abbreviation: id.to_string(),
                schema: Vec::new(),
                isolates: Vec::new(),
                version: 0,
                last_indexed_version: None,
                reference: None,
                remote: None,
            },
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.otu.version = version;
        self
    }

    pub fn last_indexed(mut self, version: u32) -> Self {
        self.otu.last_indexed_version = Some(version);
        self
    }

    pub fn reference(mut self, reference_id: &str) -> Self {
        self.otu.reference = Some(ReferenceLink {
            id: reference_id.to_string(),
        });
        self
    }

    pub fn remote(mut self, remote_id: &str) -> Self {
        self.otu.remote = Some(RemoteId {
            id: remote_id.to_string(),
        });
        self
    }

    pub fn isolate(mut self, isolate: Isolate) -> Self {
        self.otu.isolates.push(isolate);
        self
    }

    /// Add an isolate whose sequences are `<isolate_id>_s<n>`
    pub fn isolate_with(self, isolate_id: &str, default: bool, count: usize) -> Self {
        let sequences = (1..=count)
            .map(|n| sequence(&format!("{}_s{}", isolate_id, n), "ACGTACGTAC"))
            .collect();
        self.isolate(isolate(isolate_id, default, sequences))
    }

    pub fn build(self) -> Otu {
        self.otu
    }
}

/// Reference document as stored in the `references` collection
pub fn sample_reference(reference_id: &str, data_type: &str) -> Value {
    let mut reference = json!({
        "_id": reference_id,
        "name": format!("{} reference", reference_id),
        "data_type": data_type,
        "organism": "virus",
    });
    if data_type == "barcode" {
        reference["targets"] = json!([
            {"name": "ITS2", "description": "Internal transcribed spacer 2", "length": 300, "required": true}
        ]);
    }
    reference
}

pub fn seed_reference(store: &MemoryStore, reference_id: &str, data_type: &str) -> VireoResult<()> {
    store.seed(Collection::References, vec![sample_reference(reference_id, data_type)])
}

/// Store each OTU as its current document and record it in history at its version
pub fn seed_otus(store: &MemoryStore, history: &SnapshotHistory, otus: &[Otu]) -> VireoResult<()> {
    let mut documents = Vec::with_capacity(otus.len());
    for otu in otus {
        let document = serde_json::to_value(otu)?;
        history.record(Collection::Otus, &otu.id, otu.version, document.clone());
        documents.push(document);
    }
    store.seed(Collection::Otus, documents)
}

/// History entries the host pinned to `index_id` before the build started
pub fn pin_history(store: &MemoryStore, index_id: &str, otus: &[(&str, u32)]) -> VireoResult<()> {
    let entries = otus.iter().map(|(otu_id, version)| {
        json!({
            "_id": format!("{}.{}", otu_id, version),
            "otu": {"id": otu_id, "version": version},
            "index": {"id": index_id, "version": 0},
        })
    });
    store.seed(Collection::History, entries)
}
