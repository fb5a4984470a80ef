/// Pinned OTU versions for one build
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use vireo_core::error::VireoResult;

/// OTU id to target version. Iteration follows insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(IndexMap<String, u32>);

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> VireoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with(mut self, otu_id: impl Into<String>, version: u32) -> Self {
        self.insert(otu_id, version);
        self
    }

    pub fn insert(&mut self, otu_id: impl Into<String>, version: u32) {
        self.0.insert(otu_id.into(), version);
    }

    pub fn get(&self, otu_id: &str) -> Option<u32> {
        self.0.get(otu_id).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(id, version)| (id.as_str(), *version))
    }

    pub fn otu_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for Manifest {
    fn from_iter<T: IntoIterator<Item = (S, u32)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(id, v)| (id.into(), v)).collect())
    }
}
