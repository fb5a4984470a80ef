//! Sequence selection from reconstructed OTUs
//!
//! Barcode references index every sequence of every isolate. All other data
//! types index only the default isolate of each OTU. Ownership of every visited
//! sequence is recorded regardless of whether it is emitted.

use crate::otu::{DataType, Otu, Sequence};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Sequence id to owning OTU id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceOtuMap(IndexMap<String, String>);

impl SequenceOtuMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sequence_id: impl Into<String>, otu_id: impl Into<String>) {
        self.0.insert(sequence_id.into(), otu_id.into());
    }

    pub fn get(&self, sequence_id: &str) -> Option<&str> {
        self.0.get(sequence_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Lazy, single-pass stream of the sequences selected for indexing.
///
/// Each OTU is visited when the stream reaches it: its sequences are recorded
/// in the owner map and the policy-selected subset is queued for emission.
pub struct ExtractedSequences<'a, 'm, I>
where
    I: Iterator<Item = &'a Otu>,
{
    otus: I,
    barcode: bool,
    owners: &'m mut SequenceOtuMap,
    pending: std::vec::IntoIter<&'a Sequence>,
}

/// Build the extraction stream for `otus` under the given data type policy
pub fn extract_sequences<'a, 'm, I>(
    otus: I,
    data_type: &DataType,
    owners: &'m mut SequenceOtuMap,
) -> ExtractedSequences<'a, 'm, I::IntoIter>
where
    I: IntoIterator<Item = &'a Otu>,
{
    ExtractedSequences {
        otus: otus.into_iter(),
        barcode: data_type.is_barcode(),
        owners,
        pending: Vec::new().into_iter(),
    }
}

impl<'a, 'm, I> ExtractedSequences<'a, 'm, I>
where
    I: Iterator<Item = &'a Otu>,
{
    fn visit(&mut self, otu: &'a Otu) -> Vec<&'a Sequence> {
        for sequence in otu.sequences() {
            self.owners.insert(sequence.id.as_str(), otu.id.as_str());
        }

        if self.barcode {
            otu.sequences().collect()
        } else {
            // No default isolate contributes nothing rather than failing
            otu.default_isolate()
                .map(|isolate| isolate.sequences.iter().collect())
                .unwrap_or_default()
        }
    }
}

impl<'a, 'm, I> Iterator for ExtractedSequences<'a, 'm, I>
where
    I: Iterator<Item = &'a Otu>,
{
    type Item = &'a Sequence;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(sequence) = self.pending.next() {
                return Some(sequence);
            }

            let otu = self.otus.next()?;
            self.pending = self.visit(otu).into_iter();
        }
    }
}
