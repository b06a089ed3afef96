//! Greedy coverage selection.
//!
//! Fragments are visited once, in generation order. A fragment is accepted
//! when it binds (score ≤ Kd threshold) at least one variant that has been
//! credited fewer than `coverage_limit` times; all such variants are credited
//! to it together. Nothing is re-sorted or revisited, so the result depends
//! on input order and is reproducible for identical inputs.
//!
//! Variant coverage and residue coverage are gated independently: a fragment
//! lying entirely over already-covered residues is still accepted for new
//! variant hits.
//!
//! [`Selector`] is a lazy iterator of [`AcceptanceRecord`]s. Stopping early
//! leaves a consistent [`CoverageLedger`].
//!
//! # Examples
//! ```
//! use epicover::fragments::generate;
//! use epicover::matrix::AffinityMatrix;
//! use epicover::model::{Sequence, VariantSet};
//! use epicover::select::select;
//!
//! let seq = Sequence::new("ACDEFG").unwrap();
//! let frags = generate(&seq, 3, 3).unwrap();
//! let variants = VariantSet::new(["A", "B"]).unwrap();
//! // first fragment binds A, third binds A and B
//! let m = AffinityMatrix::from_fn(frags.len(), 2, |f, v| match (f, v) {
//!     (0, 0) | (2, _) => Some(50.0),
//!     _ => Some(5000.0),
//! });
//! let (records, ledger) = select(&frags, &variants, &m, seq.len(), 500.0, 1).unwrap();
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[1].new_hits.len(), 1);
//! assert_eq!(ledger.covered_variant_count(), 2);
//! ```
use log::debug;

use crate::error::ConfigError;
use crate::matrix::AffinityMatrix;
use crate::model::{validate_selection, AcceptanceRecord, Fragment, VariantId, VariantSet};

/// Cumulative selection state for one run.
#[derive(Clone, Debug, PartialEq)]
pub struct CoverageLedger {
    variants: Vec<VariantId>,
    coverage_limit: usize,
    positions: Vec<bool>,
    n_positions: usize,
    accept_count: Vec<usize>,
    n_covered_variants: usize,
}

impl CoverageLedger {
    /// An empty ledger for a sequence of `sequence_len` residues.
    pub fn new(variants: &VariantSet, sequence_len: usize, coverage_limit: usize) -> Self {
        Self {
            variants: variants.as_slice().to_vec(),
            coverage_limit,
            positions: vec![false; sequence_len],
            n_positions: 0,
            accept_count: vec![0; variants.len()],
            n_covered_variants: 0,
        }
    }

    pub fn sequence_len(&self) -> usize { self.positions.len() }

    pub fn total_variants(&self) -> usize { self.variants.len() }

    pub fn coverage_limit(&self) -> usize { self.coverage_limit }

    /// Covered residue offsets, ascending.
    pub fn covered_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.positions.iter().enumerate().filter(|(_, c)| **c).map(|(i, _)| i)
    }

    /// One flag per residue, `true` where covered.
    pub fn position_mask(&self) -> &[bool] { &self.positions }

    pub fn covered_position_count(&self) -> usize { self.n_positions }

    pub fn is_position_covered(&self, pos: usize) -> bool {
        self.positions.get(pos).copied().unwrap_or(false)
    }

    /// How many accepted fragments were credited with `variant` (0 if unknown).
    pub fn accept_count(&self, variant: &VariantId) -> usize {
        self.variants.iter().position(|v| v == variant).map_or(0, |i| self.accept_count[i])
    }

    /// `(variant, accept_count)` pairs in variant-set order.
    pub fn accept_counts(&self) -> impl Iterator<Item = (&VariantId, usize)> + '_ {
        self.variants.iter().zip(self.accept_count.iter().copied())
    }

    /// Variants hit at least once, in variant-set order.
    pub fn covered_variants(&self) -> impl Iterator<Item = &VariantId> + '_ {
        self.accept_counts().filter(|(_, n)| *n > 0).map(|(v, _)| v)
    }

    pub fn covered_variant_count(&self) -> usize { self.n_covered_variants }

    /// Variants that reached the coverage limit.
    pub fn saturated_variants(&self) -> impl Iterator<Item = &VariantId> + '_ {
        let limit = self.coverage_limit;
        self.accept_counts().filter(move |(_, n)| *n >= limit).map(|(v, _)| v)
    }

    /// Variants hit at least once, as % of all variants.
    pub fn variant_coverage(&self) -> f64 {
        percent(self.n_covered_variants, self.variants.len())
    }

    /// Covered residues, as % of the sequence.
    pub fn sequence_coverage(&self) -> f64 {
        percent(self.n_positions, self.positions.len())
    }

    fn is_saturated(&self, variant: usize) -> bool {
        self.accept_count[variant] >= self.coverage_limit
    }

    /// Mark the fragment's span covered and credit `new_hits`; returns the
    /// number of newly covered residues.
    fn apply(&mut self, fragment: &Fragment, new_hits: &[usize]) -> usize {
        let end = fragment.end().min(self.positions.len());
        let mut added = 0;
        for slot in &mut self.positions[fragment.start.min(end)..end] {
            if !*slot {
                *slot = true;
                added += 1;
            }
        }
        self.n_positions += added;
        for &v in new_hits {
            if self.accept_count[v] == 0 {
                self.n_covered_variants += 1;
            }
            self.accept_count[v] += 1;
        }
        added
    }
}

pub(crate) fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Lazy greedy selector over a fixed fragment list.
#[derive(Debug)]
pub struct Selector<'a> {
    fragments: &'a [Fragment],
    variants: &'a VariantSet,
    matrix: &'a AffinityMatrix,
    kd_threshold: f64,
    cursor: usize,
    ledger: CoverageLedger,
}

impl<'a> Selector<'a> {
    /// Validate parameters and start a run with an empty ledger.
    ///
    /// `sequence_len` is the length of the protein the fragments came from.
    pub fn new(
        fragments: &'a [Fragment],
        variants: &'a VariantSet,
        matrix: &'a AffinityMatrix,
        sequence_len: usize,
        kd_threshold: f64,
        coverage_limit: usize,
    ) -> Result<Self, ConfigError> {
        validate_selection(kd_threshold, coverage_limit)?;
        if variants.is_empty() {
            return Err(ConfigError::NoVariants);
        }
        if sequence_len == 0 {
            return Err(ConfigError::EmptySequence);
        }
        Ok(Self {
            fragments,
            variants,
            matrix,
            kd_threshold,
            cursor: 0,
            ledger: CoverageLedger::new(variants, sequence_len, coverage_limit),
        })
    }

    /// Current ledger (reflects every record yielded so far).
    pub fn ledger(&self) -> &CoverageLedger { &self.ledger }

    /// Stop the run and take the ledger.
    pub fn into_ledger(self) -> CoverageLedger { self.ledger }

    /// Fragments not yet visited.
    pub fn remaining(&self) -> usize { self.fragments.len() - self.cursor }

    /// Indices of variants the fragment binds at or below the threshold.
    fn hits(&self, fragment: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.variants.len()).filter(move |&v| self.matrix.score_or_inf(fragment, v) <= self.kd_threshold)
    }
}

impl Iterator for Selector<'_> {
    type Item = AcceptanceRecord;

    fn next(&mut self) -> Option<AcceptanceRecord> {
        while self.cursor < self.fragments.len() {
            let idx = self.cursor;
            self.cursor += 1;

            let new_hits: Vec<usize> = self.hits(idx).filter(|&v| !self.ledger.is_saturated(v)).collect();
            if new_hits.is_empty() {
                continue;
            }

            let fragment = &self.fragments[idx];
            let total = self.ledger.total_variants();
            let absolute_coverage = new_hits.len() as f64 / total as f64 * 100.0;
            let new_positions = self.ledger.apply(fragment, &new_hits);
            let record = AcceptanceRecord {
                fragment: fragment.clone(),
                new_hits: new_hits.iter().map(|&v| self.variants.as_slice()[v].clone()).collect(),
                absolute_coverage,
                new_positions,
                sequence_gain: percent(new_positions, self.ledger.sequence_len()),
                cumulative_variant_coverage: self.ledger.variant_coverage(),
                cumulative_sequence_coverage: self.ledger.sequence_coverage(),
            };
            debug!(
                "accepted {} @{} ({} new hits, +{} residues)",
                record.fragment.peptide,
                record.fragment.start,
                record.new_hits.len(),
                new_positions
            );
            return Some(record);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

/// Run selection to completion, returning all records and the final ledger.
pub fn select(
    fragments: &[Fragment],
    variants: &VariantSet,
    matrix: &AffinityMatrix,
    sequence_len: usize,
    kd_threshold: f64,
    coverage_limit: usize,
) -> Result<(Vec<AcceptanceRecord>, CoverageLedger), ConfigError> {
    let mut sel = Selector::new(fragments, variants, matrix, sequence_len, kd_threshold, coverage_limit)?;
    let records: Vec<AcceptanceRecord> = sel.by_ref().collect();
    Ok((records, sel.into_ledger()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragments::generate;
    use crate::model::Sequence;

    const STRONG: f64 = 50.0;
    const WEAK: f64 = 5000.0;

    fn setup(seq: &str, len: usize, n_variants: usize) -> (Sequence, Vec<Fragment>, VariantSet) {
        let s = Sequence::new(seq).unwrap();
        let f = generate(&s, len, len).unwrap();
        let v = VariantSet::new((0..n_variants).map(|i| format!("V{i}"))).unwrap();
        (s, f, v)
    }

    /// Matrix where `binders` lists `(fragment, variant)` pairs scoring STRONG.
    fn matrix(n_frag: usize, n_var: usize, binders: &[(usize, usize)]) -> AffinityMatrix {
        AffinityMatrix::from_fn(n_frag, n_var, |f, v| Some(if binders.contains(&(f, v)) { STRONG } else { WEAK }))
    }

    #[test]
    fn no_binders_means_no_records() {
        let (s, f, v) = setup("ACDEFGHIK", 3, 3);
        let m = matrix(f.len(), 3, &[]);
        let (records, ledger) = select(&f, &v, &m, s.len(), 500.0, 1).unwrap();
        assert!(records.is_empty());
        assert_eq!(ledger.covered_position_count(), 0);
        assert_eq!(ledger.covered_variant_count(), 0);
        assert!(ledger.accept_counts().all(|(_, n)| n == 0));
    }

    #[test]
    fn absent_entries_never_bind() {
        let (s, f, v) = setup("ACDEFG", 3, 1);
        let m = AffinityMatrix::from_fn(f.len(), 1, |_, _| None);
        let (records, _) = select(&f, &v, &m, s.len(), f64::MAX, 1).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn threshold_is_inclusive() {
        let (s, f, v) = setup("ACDEFG", 3, 1);
        let m = AffinityMatrix::from_fn(f.len(), 1, |i, _| Some(if i == 1 { 500.0 } else { 500.1 }));
        let (records, _) = select(&f, &v, &m, s.len(), 500.0, 1).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fragment.start, 1);
    }

    #[test]
    fn limit_one_credits_first_fragment_only() {
        let (s, f, v) = setup("ACDEFGHIK", 3, 2);
        // fragments 1 and 4 both hit V0; fragment 4 also hits V1
        let m = matrix(f.len(), 2, &[(1, 0), (4, 0), (4, 1)]);
        let (records, ledger) = select(&f, &v, &m, s.len(), 500.0, 1).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fragment.start, 1);
        assert_eq!(records[0].new_hits, vec![VariantId::from("V0")]);
        assert_eq!(records[1].fragment.start, 4);
        assert_eq!(records[1].new_hits, vec![VariantId::from("V1")]);
        assert_eq!(ledger.accept_count(&VariantId::from("V0")), 1);
        assert_eq!(ledger.accept_count(&VariantId::from("V1")), 1);
    }

    #[test]
    fn saturated_hits_reject_fragment() {
        let (s, f, v) = setup("ACDEFGHIK", 3, 1);
        let m = matrix(f.len(), 1, &[(0, 0), (3, 0)]);
        let (records, ledger) = select(&f, &v, &m, s.len(), 500.0, 1).unwrap();
        assert_eq!(records.len(), 1);
        // fragment 3 was rejected, so its residues are not covered
        assert!(!ledger.is_position_covered(3));
        assert_eq!(ledger.covered_positions().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn limit_two_credits_first_two_of_three() {
        let (s, f, v) = setup("ACDEFGHIK", 3, 1);
        let m = matrix(f.len(), 1, &[(0, 0), (2, 0), (5, 0)]);
        let (records, ledger) = select(&f, &v, &m, s.len(), 500.0, 2).unwrap();
        let starts: Vec<usize> = records.iter().map(|r| r.fragment.start).collect();
        assert_eq!(starts, vec![0, 2]);
        assert_eq!(ledger.accept_count(&VariantId::from("V0")), 2);
        assert_eq!(ledger.saturated_variants().count(), 1);
    }

    #[test]
    fn overlap_accepted_for_variant_coverage_alone() {
        let s = Sequence::new("ACDEFG").unwrap();
        let f = generate(&s, 2, 3).unwrap();
        // (0,3)=ACD hits V0, then (1,2)=CD lies inside it and hits V1
        assert_eq!((f[1].start, f[1].len()), (0, 3));
        assert_eq!((f[2].start, f[2].len()), (1, 2));
        let v = VariantSet::new(["V0", "V1"]).unwrap();
        let m = matrix(f.len(), 2, &[(1, 0), (2, 1)]);
        let (records, ledger) = select(&f, &v, &m, s.len(), 500.0, 1).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].new_positions, 0);
        assert_eq!(records[1].sequence_gain, 0.0);
        assert_eq!(records[1].cumulative_sequence_coverage, records[0].cumulative_sequence_coverage);
        assert_eq!(ledger.covered_position_count(), 3);
    }

    #[test]
    fn metrics_on_acceptance() {
        let (s, f, v) = setup("ACDEFGHIKL", 5, 4);
        let m = matrix(f.len(), 4, &[(0, 0), (0, 1), (0, 2), (3, 3)]);
        let (records, _) = select(&f, &v, &m, s.len(), 500.0, 1).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].absolute_coverage, 75.0);
        assert_eq!(records[0].cumulative_variant_coverage, 75.0);
        assert_eq!(records[0].cumulative_sequence_coverage, 50.0);
        assert_eq!(records[0].new_positions, 5);
        assert_eq!(records[1].absolute_coverage, 25.0);
        assert_eq!(records[1].cumulative_variant_coverage, 100.0);
        // span 3..8 adds residues 5,6,7
        assert_eq!(records[1].new_positions, 3);
        assert_eq!(records[1].cumulative_sequence_coverage, 80.0);
    }

    #[test]
    fn early_stop_keeps_ledger_consistent() {
        let (s, f, v) = setup("ACDEFGHIK", 3, 3);
        let m = matrix(f.len(), 3, &[(0, 0), (2, 1), (5, 2)]);
        let mut sel = Selector::new(&f, &v, &m, s.len(), 500.0, 1).unwrap();
        let first = sel.next().unwrap();
        assert_eq!(first.fragment.start, 0);
        let ledger = sel.into_ledger();
        assert_eq!(ledger.covered_variant_count(), 1);
        assert_eq!(ledger.covered_positions().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(ledger.variant_coverage(), first.cumulative_variant_coverage);
    }

    #[test]
    fn rerun_is_deterministic() {
        let (s, f, v) = setup("ACDEFGHIKLMNPQ", 4, 3);
        let m = AffinityMatrix::from_fn(f.len(), 3, |i, j| Some(((i * 7 + j * 13) % 11) as f64 * 100.0));
        let a = select(&f, &v, &m, s.len(), 400.0, 2).unwrap();
        let b = select(&f, &v, &m, s.len(), 400.0, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_parameters() {
        let (s, f, v) = setup("ACDEFG", 3, 1);
        let m = matrix(f.len(), 1, &[]);
        assert!(matches!(Selector::new(&f, &v, &m, s.len(), 0.0, 1), Err(ConfigError::InvalidThreshold(_))));
        assert!(matches!(Selector::new(&f, &v, &m, s.len(), -3.0, 1), Err(ConfigError::InvalidThreshold(_))));
        assert!(matches!(Selector::new(&f, &v, &m, s.len(), 500.0, 0), Err(ConfigError::InvalidCoverageLimit(0))));
    }
}
