pub mod fasta;

// Re-export commonly used functions
pub use fasta::{parse_fasta_bytes, read_sequence_file, write_sequence_file, FastaRecord};
