//! FASTA sequence file writer and reader
//!
//! Records are written as a `>` header carrying the sequence id followed by
//! the raw sequence on a single line.

use crate::otu::Sequence;
use nom::{
    bytes::complete::{tag, take_till},
    character::complete::{line_ending, not_line_ending},
    combinator::{map_res, opt},
    sequence::preceded,
    IResult,
};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use vireo_core::error::{VireoError, VireoResult};

/// A single `(id, sequence)` record read back from a FASTA file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub sequence: String,
}

/// Stream `sequences` to `path`, one record per sequence in emission order.
///
/// Records go through a `BufWriter`, so memory use does not grow with the
/// number of sequences. Returns the number of records written.
pub fn write_sequence_file<'a, P, I>(path: P, sequences: I) -> VireoResult<usize>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a Sequence>,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| VireoError::filesystem(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut count = 0;

    for sequence in sequences {
        writeln!(writer, ">{}", sequence.id).map_err(|e| VireoError::filesystem(path, e))?;
        writeln!(writer, "{}", sequence.sequence).map_err(|e| VireoError::filesystem(path, e))?;
        count += 1;
    }

    writer.flush().map_err(|e| VireoError::filesystem(path, e))?;
    tracing::debug!(path = %path.display(), records = count, "wrote sequence file");
    Ok(count)
}

/// Read a sequence file written by [`write_sequence_file`]
pub fn read_sequence_file<P: AsRef<Path>>(path: P) -> VireoResult<Vec<FastaRecord>> {
    let path = path.as_ref();
    let mut buffer = Vec::new();
    File::open(path)
        .and_then(|mut file| file.read_to_end(&mut buffer))
        .map_err(|e| VireoError::filesystem(path, e))?;

    parse_fasta_bytes(&buffer)
}

/// Parse a FASTA header line, returning the record id
fn parse_header(input: &[u8]) -> IResult<&[u8], &str> {
    let (input, _) = tag(b">")(input)?;
    let (input, id) = map_res(
        take_till(|c: u8| c == b' ' || c == b'\t' || c == b'\n' || c == b'\r'),
        std::str::from_utf8,
    )(input)?;
    let (input, _) = opt(preceded(tag(b" "), not_line_ending))(input)?;
    let (input, _) = opt(line_ending)(input)?;
    Ok((input, id))
}

/// Parse sequence lines until the next header or EOF
fn parse_sequence(input: &[u8]) -> IResult<&[u8], String> {
    let mut sequence = String::new();
    let mut remaining = input;

    while !remaining.is_empty() && remaining[0] != b'>' {
        let (rest, line) =
            take_till::<_, _, nom::error::Error<_>>(|c: u8| c == b'\n' || c == b'\r')(remaining)?;
        let (rest, _) = opt(line_ending)(rest)?;

        // Lone carriage return
        if rest.len() == remaining.len() {
            remaining = &remaining[1..];
            continue;
        }

        for &c in line {
            if !c.is_ascii_whitespace() {
                sequence.push(c as char);
            }
        }

        remaining = rest;
    }

    Ok((remaining, sequence))
}

/// Parse FASTA records from bytes
pub fn parse_fasta_bytes(data: &[u8]) -> VireoResult<Vec<FastaRecord>> {
    let mut records = Vec::new();
    let mut remaining = data;

    loop {
        while let Some((first, rest)) = remaining.split_first() {
            if first.is_ascii_whitespace() {
                remaining = rest;
            } else {
                break;
            }
        }

        if remaining.is_empty() {
            break;
        }

        let (rest, id) = parse_header(remaining)
            .map_err(|_| VireoError::Parse("Failed to parse FASTA header".to_string()))?;
        let (rest, sequence) = parse_sequence(rest)
            .map_err(|_| VireoError::Parse("Failed to parse FASTA sequence".to_string()))?;

        records.push(FastaRecord {
            id: id.to_string(),
            sequence,
        });
        remaining = rest;
    }

    Ok(records)
}
