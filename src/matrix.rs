//! Affinity matrix construction.
//!
//! ### Design
//! - One oracle call per variant, each covering the full batch of distinct
//!   peptide texts. Fragments sharing a text share the score.
//! - **Parallelism**: calls run on a local Rayon pool; `threads = None` uses
//!   all logical cores. Results are merged in variant order before returning,
//!   so the matrix does not depend on scheduling.
//!
//! ### Errors
//! An unsupported variant is recorded in [`BuildReport::skipped`] and its
//! column stays empty. Any [`OracleError`] aborts the build; when several
//! variants fail, the first in variant order is reported.
use std::collections::HashMap;

use log::{info, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::error::{CoverError, OracleError};
use crate::model::{Fragment, VariantId, VariantSet};
use crate::oracle::{AffinityOracle, VariantScores};

/// Scores for every `(fragment, variant)` pair; `None` is an absent entry.
///
/// Rows follow fragment order, columns follow [`VariantSet`] order.
#[derive(Clone, Debug, PartialEq)]
pub struct AffinityMatrix {
    n_variants: usize,
    rows: Vec<Vec<Option<f64>>>,
}

impl AffinityMatrix {
    /// Build a matrix from a scoring function over `(fragment_idx, variant_idx)`.
    pub fn from_fn<F>(n_fragments: usize, n_variants: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> Option<f64>,
    {
        let rows = (0..n_fragments)
            .map(|i| (0..n_variants).map(|j| f(i, j).filter(|s| s.is_finite())).collect())
            .collect();
        Self { n_variants, rows }
    }

    pub fn n_fragments(&self) -> usize { self.rows.len() }

    pub fn n_variants(&self) -> usize { self.n_variants }

    /// Score for a pair, or `None` if the oracle could not score it.
    pub fn get(&self, fragment: usize, variant: usize) -> Option<f64> {
        self.rows.get(fragment).and_then(|r| r.get(variant)).copied().flatten()
    }

    /// Score for a pair with absent entries read as `+inf` (non-binding).
    pub fn score_or_inf(&self, fragment: usize, variant: usize) -> f64 {
        self.get(fragment, variant).unwrap_or(f64::INFINITY)
    }

    /// Number of present entries.
    pub fn scored_pairs(&self) -> usize {
        self.rows.iter().map(|r| r.iter().filter(|s| s.is_some()).count()).sum()
    }
}

/// Summary of a matrix build.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildReport {
    /// Variants the oracle did not support, with its reason.
    pub skipped: Vec<(VariantId, String)>,
    /// Distinct peptide texts sent per variant.
    pub distinct_peptides: usize,
    /// Present `(fragment, variant)` entries.
    pub scored_pairs: usize,
}

/// Score all `fragments` against all `variants` with `oracle`.
pub fn build<O>(
    fragments: &[Fragment],
    variants: &VariantSet,
    oracle: &O,
    threads: Option<usize>,
) -> Result<(AffinityMatrix, BuildReport), CoverError>
where
    O: AffinityOracle + ?Sized,
{
    // Deduplicate peptide texts, remembering which distinct entry each fragment uses.
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut distinct: Vec<&str> = Vec::new();
    let slot: Vec<usize> = fragments
        .iter()
        .map(|f| {
            *index.entry(f.peptide.as_str()).or_insert_with(|| {
                distinct.push(f.peptide.as_str());
                distinct.len() - 1
            })
        })
        .collect();

    info!(
        "scoring {} distinct peptides ({} fragments) against {} variants",
        distinct.len(),
        fragments.len(),
        variants.len()
    );

    let n = threads.unwrap_or_else(num_cpus::get).max(1);
    let pool = ThreadPoolBuilder::new().num_threads(n).build()?;
    let columns: Vec<Result<VariantScores, OracleError>> = pool.install(|| {
        variants
            .as_slice()
            .par_iter()
            .map(|v| oracle.score_many(&distinct, v))
            .collect()
    });

    let mut by_variant: Vec<Option<Vec<Option<f64>>>> = Vec::with_capacity(variants.len());
    let mut report = BuildReport { distinct_peptides: distinct.len(), ..BuildReport::default() };
    for (variant, column) in variants.iter().zip(columns) {
        match column? {
            VariantScores::Scored(scores) => {
                if scores.len() != distinct.len() {
                    return Err(OracleError::BatchLength {
                        variant: variant.to_string(),
                        expected: distinct.len(),
                        got: scores.len(),
                    }
                    .into());
                }
                by_variant.push(Some(scores));
            }
            VariantScores::Unsupported { reason } => {
                warn!("skipping variant {variant}: {reason}");
                report.skipped.push((variant.clone(), reason));
                by_variant.push(None);
            }
        }
    }

    let matrix = AffinityMatrix::from_fn(fragments.len(), variants.len(), |fi, vi| {
        by_variant[vi].as_ref().and_then(|col| col[slot[fi]])
    });
    report.scored_pairs = matrix.scored_pairs();
    info!(
        "affinity matrix ready: {} scored pairs, {} variants skipped",
        report.scored_pairs,
        report.skipped.len()
    );
    Ok((matrix, report))
}
