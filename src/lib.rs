#![forbid(unsafe_code)]
//! # epicover
//!
//! Greedy selection of **peptides** from a protein that together bind as many
//! **HLA alleles** (receptor variants) as possible, while tracking how much of
//! the protein the chosen peptides cover.
//!
//! ## Pipeline
//! 1. [`fragments::generate`] enumerates every peptide in a length range.
//! 2. [`matrix::build`] asks an [`oracle::AffinityOracle`] for the affinity
//!    of every `(peptide, allele)` pair; unsupported alleles are skipped.
//! 3. [`select::Selector`] walks peptides in sequence order and accepts those
//!    with at least one binding allele that is not yet saturated.
//! 4. [`metrics`] and [`report`] turn the accepted records into coverage
//!    curves, summaries and tables.
//!
//! The selection is a one-pass greedy heuristic: it never re-sorts peptides
//! by marginal gain, so it is deterministic but not optimal.
//!
//! ## Examples
//! ```rust
//! use epicover::model::{RunParams, Sequence, VariantSet};
//! use epicover::oracle::TableOracle;
//!
//! let seq = Sequence::new("SIINFEKLAAGIGILTV").unwrap();
//! let variants = VariantSet::new(["HLA-A*02:01", "HLA-B*08:01"]).unwrap();
//! let mut oracle = TableOracle::default();
//! oracle.insert("HLA-B*08:01", "SIINFEKL", 20.0);
//! oracle.insert("HLA-A*02:01", "AAGIGILTV", 45.0);
//!
//! let run = epicover::run_coverage(&seq, &variants, &oracle, &RunParams::default(), Some(1)).unwrap();
//! assert_eq!(run.records.len(), 2);
//! assert_eq!(run.ledger.variant_coverage(), 100.0);
//! assert!(run.build.skipped.is_empty());
//! ```

pub mod error;
pub mod fragments;
pub mod io;
pub mod matrix;
pub mod metrics;
pub mod model;
pub mod oracle;
pub mod report;
pub mod select;

use log::info;

use error::CoverError;
use matrix::{AffinityMatrix, BuildReport};
use model::{AcceptanceRecord, Fragment, RunParams, Sequence, VariantSet};
use oracle::AffinityOracle;
use select::{CoverageLedger, Selector};

/// Fragments and affinities for a run, ready for selection.
///
/// Records can be consumed one at a time through [`PreparedRun::selector`].
#[derive(Clone, Debug)]
pub struct PreparedRun {
    pub sequence: Sequence,
    pub variants: VariantSet,
    pub params: RunParams,
    pub fragments: Vec<Fragment>,
    pub matrix: AffinityMatrix,
    pub build: BuildReport,
}

impl PreparedRun {
    /// A fresh selector with an empty ledger.
    pub fn selector(&self) -> Result<Selector<'_>, CoverError> {
        Ok(Selector::new(
            &self.fragments,
            &self.variants,
            &self.matrix,
            self.sequence.len(),
            self.params.kd_threshold,
            self.params.coverage_limit,
        )?)
    }
}

/// Validate parameters, generate fragments and build the affinity matrix.
///
/// All configuration errors are reported before the oracle is called.
pub fn prepare<O>(
    sequence: &Sequence,
    variants: &VariantSet,
    oracle: &O,
    params: &RunParams,
    threads: Option<usize>,
) -> Result<PreparedRun, CoverError>
where
    O: AffinityOracle + ?Sized,
{
    params.validate()?;
    let fragments = fragments::generate(sequence, params.min_length, params.max_length)?;
    info!(
        "generated {} peptides ({}-{} aa) from a {} aa sequence",
        fragments.len(),
        params.min_length,
        params.max_length,
        sequence.len()
    );
    let (matrix, build) = matrix::build(&fragments, variants, oracle, threads)?;
    Ok(PreparedRun {
        sequence: sequence.clone(),
        variants: variants.clone(),
        params: params.clone(),
        fragments,
        matrix,
        build,
    })
}

/// Outcome of a complete run.
#[derive(Clone, Debug)]
pub struct CoverageRun {
    /// Number of peptides considered.
    pub fragments: usize,
    /// Accepted peptides in acceptance order.
    pub records: Vec<AcceptanceRecord>,
    /// Final ledger.
    pub ledger: CoverageLedger,
    /// Matrix build summary (skipped variants).
    pub build: BuildReport,
}

/// Run the whole pipeline and collect every record.
pub fn run_coverage<O>(
    sequence: &Sequence,
    variants: &VariantSet,
    oracle: &O,
    params: &RunParams,
    threads: Option<usize>,
) -> Result<CoverageRun, CoverError>
where
    O: AffinityOracle + ?Sized,
{
    let prepared = prepare(sequence, variants, oracle, params, threads)?;
    let mut selector = prepared.selector()?;
    let records: Vec<AcceptanceRecord> = selector.by_ref().collect();
    let ledger = selector.into_ledger();
    info!(
        "selected {} peptides: {:.2}% variant coverage, {:.2}% sequence coverage",
        records.len(),
        ledger.variant_coverage(),
        ledger.sequence_coverage()
    );
    Ok(CoverageRun { fragments: prepared.fragments.len(), records, ledger, build: prepared.build })
}

/// Crate version string (from `CARGO_PKG_VERSION`).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
