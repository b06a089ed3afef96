//! Input readers for the protein sequence and the variant table.
//!
//! - **Sequence**: FASTA (first record, parsed with `bio`) or a plain text
//!   file whose whitespace is ignored.
//! - **Variant table**: CSV/TSV read with `csv`; only the header row matters,
//!   each column header is one variant identifier.
//!
//! Errors are bubbled as [`CoverError`] to the caller.
use std::io::Read;
use std::path::Path;

use bio::io::fasta;

use crate::error::CoverError;
use crate::model::{Sequence, VariantSet};

/// Parse a protein sequence from FASTA or plain text.
///
/// # Examples
/// ```
/// let s = epicover::io::parse_sequence(">sp|P0|demo\nMKTAY\nIAKQR\n>other\nAAAA\n").unwrap();
/// assert_eq!(s.as_str(), "MKTAYIAKQR");
/// let s = epicover::io::parse_sequence("mkta yiak\n").unwrap();
/// assert_eq!(s.as_str(), "MKTAYIAK");
/// ```
pub fn parse_sequence(text: &str) -> Result<Sequence, CoverError> {
    if text.trim_start().starts_with('>') {
        let reader = fasta::Reader::new(text.trim_start().as_bytes());
        let record = match reader.records().next() {
            Some(rec) => rec?,
            None => return Err(crate::error::ConfigError::EmptySequence.into()),
        };
        let raw = String::from_utf8_lossy(record.seq()).into_owned();
        return Ok(Sequence::new(&raw)?);
    }
    let raw: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(Sequence::new(&raw)?)
}

/// Read a protein sequence file (FASTA or plain text).
pub fn read_sequence<P: AsRef<Path>>(path: P) -> Result<Sequence, CoverError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_sequence(&text)
}

/// Read the variant identifiers from the header row of a table.
pub fn read_variants<R: Read>(reader: R, delimiter: u8) -> Result<VariantSet, CoverError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?;
    let ids: Vec<String> = headers.iter().map(|h| h.trim().to_string()).filter(|h| !h.is_empty()).collect();
    Ok(VariantSet::new(ids)?)
}

/// Read a variant table file. Tab-delimited when the extension is `.tsv`.
pub fn read_variant_table<P: AsRef<Path>>(path: P) -> Result<VariantSet, CoverError> {
    let p = path.as_ref();
    let delim = if p.extension().map(|e| e == "tsv").unwrap_or(false) { b'\t' } else { b',' };
    read_variants(std::fs::File::open(p)?, delim)
}
