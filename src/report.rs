//! Tabular export of acceptance records.
//!
//! Records are laid out as a polars [`DataFrame`] (one row per accepted
//! peptide), which the CLI pretty-prints or writes as CSV.
use std::io::Write;

use polars::prelude::*;

use crate::model::AcceptanceRecord;

/// Column names of [`records_frame`], in order.
pub const COLUMNS: [&str; 7] = [
    "peptide",
    "start",
    "length",
    "variant_hits",
    "absolute_coverage",
    "cumulative_variant_coverage",
    "cumulative_sequence_coverage",
];

/// Build a frame with one row per record.
pub fn records_frame(records: &[AcceptanceRecord]) -> PolarsResult<DataFrame> {
    df!(
        COLUMNS[0] => records.iter().map(|r| r.fragment.peptide.clone()).collect::<Vec<_>>(),
        COLUMNS[1] => records.iter().map(|r| r.fragment.start as u64).collect::<Vec<_>>(),
        COLUMNS[2] => records.iter().map(|r| r.fragment.len() as u64).collect::<Vec<_>>(),
        COLUMNS[3] => records.iter().map(join_hits).collect::<Vec<_>>(),
        COLUMNS[4] => records.iter().map(|r| r.absolute_coverage).collect::<Vec<_>>(),
        COLUMNS[5] => records.iter().map(|r| r.cumulative_variant_coverage).collect::<Vec<_>>(),
        COLUMNS[6] => records.iter().map(|r| r.cumulative_sequence_coverage).collect::<Vec<_>>(),
    )
}

/// Comma-joined variant identifiers credited to a record.
pub fn join_hits(r: &AcceptanceRecord) -> String {
    r.new_hits.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
}

/// Write `records` as CSV (with header) to `w`.
pub fn write_csv<W: Write>(records: &[AcceptanceRecord], w: W) -> PolarsResult<()> {
    let mut df = records_frame(records)?;
    CsvWriter::new(w).include_header(true).finish(&mut df)
}
