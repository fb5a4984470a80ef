//! Exportable JSON snapshot of a reference
//!
//! The export restricts each entity to a fixed field set and substitutes
//! remote mirror identifiers for local ones whenever they are present.

use crate::otu::{DataType, Isolate, Otu, Reference, SchemaSegment, Sequence, Target};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use vireo_core::error::{VireoError, VireoResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSequence {
    #[serde(rename = "_id")]
    pub id: String,
    pub accession: String,
    pub definition: String,
    pub host: String,
    pub sequence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportIsolate {
    pub id: String,
    pub source_type: String,
    pub source_name: String,
    pub default: bool,
    pub sequences: Vec<ExportSequence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOtu {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub abbreviation: String,
    pub schema: Vec<SchemaSegment>,
    pub isolates: Vec<ExportIsolate>,
}

/// Top-level document written to `reference.json.gz`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub data_type: DataType,
    pub organism: String,
    pub otus: Vec<ExportOtu>,
    pub targets: Option<Vec<Target>>,
}

impl From<&Sequence> for ExportSequence {
    fn from(sequence: &Sequence) -> Self {
        Self {
            id: sequence.export_id().to_string(),
            accession: sequence.accession.clone(),
            definition: sequence.definition.clone(),
            host: sequence.host.clone(),
            sequence: sequence.sequence.clone(),
            segment: sequence.segment.clone(),
            target: sequence.target.clone(),
        }
    }
}

impl From<&Isolate> for ExportIsolate {
    fn from(isolate: &Isolate) -> Self {
        Self {
            id: isolate.id.clone(),
            source_type: isolate.source_type.clone(),
            source_name: isolate.source_name.clone(),
            default: isolate.default,
            sequences: isolate.sequences.iter().map(ExportSequence::from).collect(),
        }
    }
}

impl From<&Otu> for ExportOtu {
    fn from(otu: &Otu) -> Self {
        Self {
            id: otu.export_id().to_string(),
            name: otu.name.clone(),
            abbreviation: otu.abbreviation.clone(),
            schema: otu.schema.clone(),
            isolates: otu.isolates.iter().map(ExportIsolate::from).collect(),
        }
    }
}

/// Project reconstructed OTUs into their exportable form
pub fn prepare_export_otus<'a, I>(otus: I) -> Vec<ExportOtu>
where
    I: IntoIterator<Item = &'a Otu>,
{
    otus.into_iter().map(ExportOtu::from).collect()
}

pub fn prepare_export<'a, I>(reference: &Reference, otus: I) -> ExportDocument
where
    I: IntoIterator<Item = &'a Otu>,
{
    ExportDocument {
        data_type: reference.data_type.clone(),
        organism: reference.organism.clone(),
        otus: prepare_export_otus(otus),
        targets: reference.targets.clone(),
    }
}

/// Serialize `document` as JSON and gzip it to `path`
pub fn write_export_snapshot<T, P>(path: P, document: &T) -> VireoResult<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| VireoError::filesystem(path, e))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());

    serde_json::to_writer(&mut encoder, document)?;

    encoder
        .finish()
        .and_then(|mut writer| writer.flush())
        .map_err(|e| VireoError::filesystem(path, e))?;

    tracing::debug!(path = %path.display(), "wrote export snapshot");
    Ok(())
}

pub fn read_export_snapshot<T, P>(path: P) -> VireoResult<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| VireoError::filesystem(path, e))?;
    let decoder = GzDecoder::new(BufReader::new(file));
    Ok(serde_json::from_reader(decoder)?)
}
