//! Typed OTU, isolate, sequence and reference records
//!
//! These mirror the documents held in the store. Field names follow the stored
//! documents (`_id`, `last_indexed_version`, ...) so records round-trip through
//! `serde_json` without a mapping layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the same entity in an external mirror
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteId {
    pub id: String,
}

/// Link from an OTU back to its parent reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLink {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub accession: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub host: String,
    pub sequence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteId>,
}

impl Sequence {
    pub fn new(id: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            accession: String::new(),
            definition: String::new(),
            host: String::new(),
            sequence: sequence.into(),
            segment: None,
            target: None,
            remote: None,
        }
    }

    /// Identifier used in exports: the remote id when one is present
    pub fn export_id(&self) -> &str {
        self.remote.as_ref().map(|r| r.id.as_str()).unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Isolate {
    pub id: String,
    #[serde(default)]
    pub source_type: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub sequences: Vec<Sequence>,
}

/// One segment of an OTU's genome layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSegment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub molecule: Option<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Otu {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub abbreviation: String,
    #[serde(default)]
    pub schema: Vec<SchemaSegment>,
    #[serde(default)]
    pub isolates: Vec<Isolate>,
    pub version: u32,
    #[serde(default)]
    pub last_indexed_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteId>,
}

impl Otu {
    /// The isolate flagged `default`, if any
    pub fn default_isolate(&self) -> Option<&Isolate> {
        self.isolates.iter().find(|isolate| isolate.default)
    }

    /// All sequences across every isolate, in isolate order
    pub fn sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.isolates.iter().flat_map(|isolate| isolate.sequences.iter())
    }

    pub fn sequence_count(&self) -> usize {
        self.isolates.iter().map(|isolate| isolate.sequences.len()).sum()
    }

    /// Identifier used in exports: the remote id when one is present
    pub fn export_id(&self) -> &str {
        self.remote.as_ref().map(|r| r.id.as_str()).unwrap_or(&self.id)
    }
}

/// Data type of a reference. Drives which sequences are indexed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    Genome,
    Barcode,
    Other(String),
}

impl DataType {
    pub fn as_str(&self) -> &str {
        match self {
            DataType::Genome => "genome",
            DataType::Barcode => "barcode",
            DataType::Other(name) => name,
        }
    }

    pub fn is_barcode(&self) -> bool {
        matches!(self, DataType::Barcode)
    }
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "genome" => DataType::Genome,
            "barcode" => DataType::Barcode,
            _ => DataType::Other(value),
        }
    }
}

impl From<&str> for DataType {
    fn from(value: &str) -> Self {
        DataType::from(value.to_string())
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        match value {
            DataType::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amplicon target of a barcode reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default)]
    pub required: bool,
}

/// Parent reference metadata. Read-only during a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_id")]
    pub id: String,
    pub data_type: DataType,
    #[serde(default)]
    pub organism: String,
    #[serde(default)]
    pub targets: Option<Vec<Target>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_type_parsing() {
        assert_eq!(DataType::from("genome"), DataType::Genome);
        assert_eq!(DataType::from("barcode"), DataType::Barcode);
        assert_eq!(
            DataType::from("amplicon"),
            DataType::Other("amplicon".to_string())
        );
        assert!(DataType::Barcode.is_barcode());
        assert!(!DataType::Other("barcode-ish".to_string()).is_barcode());
    }

    #[test]
    fn test_data_type_serializes_as_plain_string() {
        let value = serde_json::to_value(DataType::Other("rna".to_string())).unwrap();
        assert_eq!(value, json!("rna"));

        let parsed: DataType = serde_json::from_value(json!("barcode")).unwrap();
        assert_eq!(parsed, DataType::Barcode);
    }

    #[test]
    fn test_otu_from_store_document() {
        let doc = json!({
            "_id": "otu1",
            "name": "Tobacco mosaic virus",
            "abbreviation": "TMV",
            "version": 4,
            "last_indexed_version": null,
            "reference": {"id": "ref1"},
            "remote": {"id": "remote-otu1"},
            "isolates": [{
                "id": "iso1",
                "source_type": "isolate",
                "source_name": "A",
                "default": true,
                "sequences": [{"_id": "s1", "sequence": "ATGC", "segment": "RNA1"}]
            }]
        });

        let otu: Otu = serde_json::from_value(doc).unwrap();

        assert_eq!(otu.version, 4);
        assert_eq!(otu.last_indexed_version, None);
        assert_eq!(otu.export_id(), "remote-otu1");
        assert_eq!(otu.default_isolate().unwrap().id, "iso1");
        assert_eq!(otu.sequence_count(), 1);

        let sequence = otu.sequences().next().unwrap();
        assert_eq!(sequence.segment.as_deref(), Some("RNA1"));
        assert_eq!(sequence.export_id(), "s1");
        assert!(otu.schema.is_empty());
    }

    #[test]
    fn test_sequence_export_id_prefers_remote() {
        let mut sequence = Sequence::new("local", "ACGT");
        assert_eq!(sequence.export_id(), "local");

        sequence.remote = Some(RemoteId {
            id: "mirror".to_string(),
        });
        assert_eq!(sequence.export_id(), "mirror");
    }
}
