//! Sequence-level model and artifact formats for Vireo

pub mod export;
pub mod extract;
pub mod formats;
pub mod otu;

// Re-export commonly used types
pub use export::{
    prepare_export, prepare_export_otus, read_export_snapshot, write_export_snapshot,
    ExportDocument, ExportIsolate, ExportOtu, ExportSequence,
};
pub use extract::{extract_sequences, ExtractedSequences, SequenceOtuMap};
pub use formats::fasta::{read_sequence_file, write_sequence_file, FastaRecord};
pub use otu::{
    DataType, Isolate, Otu, Reference, ReferenceLink, RemoteId, SchemaSegment, Sequence, Target,
};
