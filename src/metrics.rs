//! Coverage metrics derived from a selection run.
//!
//! [`coverage_curve`] turns acceptance records into the residue-vs-variant
//! coverage series (one point per accepted fragment). [`CoverageSummary`]
//! condenses a final (or partial) ledger.
use crate::model::{AcceptanceRecord, VariantId};
use crate::select::CoverageLedger;

/// One point of the coverage curve, both axes in percent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoveragePoint {
    /// Cumulative residue coverage.
    pub sequence_coverage: f64,
    /// Cumulative variant coverage.
    pub variant_coverage: f64,
}

/// Lazy curve over a slice of records. Clone it to restart.
#[derive(Clone, Debug)]
pub struct CoverageCurve<'a> {
    records: std::slice::Iter<'a, AcceptanceRecord>,
}

impl Iterator for CoverageCurve<'_> {
    type Item = CoveragePoint;

    fn next(&mut self) -> Option<CoveragePoint> {
        self.records.next().map(|r| CoveragePoint {
            sequence_coverage: r.cumulative_sequence_coverage.clamp(0.0, 100.0),
            variant_coverage: r.cumulative_variant_coverage.clamp(0.0, 100.0),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) { self.records.size_hint() }
}

impl ExactSizeIterator for CoverageCurve<'_> {}

/// Coverage series for `records`, in record order.
///
/// # Examples
/// ```
/// let curve = epicover::metrics::coverage_curve(&[]);
/// assert_eq!(curve.count(), 0);
/// ```
pub fn coverage_curve(records: &[AcceptanceRecord]) -> CoverageCurve<'_> {
    CoverageCurve { records: records.iter() }
}

/// End-of-run summary of a [`CoverageLedger`].
#[derive(Clone, Debug, PartialEq)]
pub struct CoverageSummary {
    pub total_variants: usize,
    pub covered_variants: usize,
    /// Variants credited `coverage_limit` times.
    pub saturated_variants: usize,
    /// Variants never hit, in variant-set order.
    pub uncovered: Vec<VariantId>,
    pub sequence_len: usize,
    pub covered_residues: usize,
    pub variant_coverage: f64,
    pub sequence_coverage: f64,
    /// One flag per residue, `true` where covered.
    pub residue_mask: Vec<bool>,
}

impl CoverageSummary {
    pub fn from_ledger(ledger: &CoverageLedger) -> Self {
        Self {
            total_variants: ledger.total_variants(),
            covered_variants: ledger.covered_variant_count(),
            saturated_variants: ledger.saturated_variants().count(),
            uncovered: ledger.accept_counts().filter(|(_, n)| *n == 0).map(|(v, _)| v.clone()).collect(),
            sequence_len: ledger.sequence_len(),
            covered_residues: ledger.covered_position_count(),
            variant_coverage: ledger.variant_coverage(),
            sequence_coverage: ledger.sequence_coverage(),
            residue_mask: ledger.position_mask().to_vec(),
        }
    }

    /// Maximal runs of uncovered residues as `start..end` ranges.
    pub fn gaps(&self) -> Vec<core::ops::Range<usize>> {
        let mut out = Vec::new();
        let mut open: Option<usize> = None;
        for (i, &covered) in self.residue_mask.iter().enumerate() {
            match (covered, open) {
                (false, None) => open = Some(i),
                (true, Some(s)) => {
                    out.push(s..i);
                    open = None;
                }
                _ => {}
            }
        }
        if let Some(s) = open {
            out.push(s..self.residue_mask.len());
        }
        out
    }
}
