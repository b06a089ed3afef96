//! Binding-affinity oracle interface.
//!
//! The prediction model itself is external. The crate only needs a batched
//! scorer that can tell *"this variant is not supported"* apart from
//! *"this request is broken"*; the former is the tagged
//! [`VariantScores::Unsupported`] result, the latter an [`OracleError`].
//!
//! [`TableOracle`] answers from a precomputed prediction table, such as the
//! CSV written by an MHC class I affinity predictor.
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::error::{CoverError, OracleError};
use crate::model::{is_amino_acid, VariantId};

/// Result of scoring one batch of peptides against one variant.
#[derive(Clone, Debug, PartialEq)]
pub enum VariantScores {
    /// One entry per requested peptide, in request order. `None` marks a
    /// pair the oracle could not score.
    Scored(Vec<Option<f64>>),
    /// The variant cannot be scored at all; it is skipped for the whole run.
    Unsupported { reason: String },
}

/// A batched binding-affinity scorer (lower score = stronger binding).
pub trait AffinityOracle: Sync {
    /// Score every peptide in `peptides` against `variant`.
    fn score_many(&self, peptides: &[&str], variant: &VariantId) -> Result<VariantScores, OracleError>;
}

impl<T: AffinityOracle + ?Sized> AffinityOracle for &T {
    fn score_many(&self, peptides: &[&str], variant: &VariantId) -> Result<VariantScores, OracleError> {
        (**self).score_many(peptides, variant)
    }
}

/// Column names accepted for the affinity value, matched case-insensitively.
pub const AFFINITY_COLUMNS: &[&str] = &["affinity", "mhcflurry_affinity", "prediction", "kd"];

/// Oracle backed by an in-memory `(allele, peptide) -> affinity` table.
///
/// # Examples
/// ```
/// use epicover::oracle::{AffinityOracle, TableOracle, VariantScores};
/// use epicover::model::VariantId;
/// let mut t = TableOracle::default();
/// t.insert("HLA-A*02:01", "SIINFEKL", 35.0);
/// let a2 = VariantId::from("HLA-A*02:01");
/// assert_eq!(t.score_many(&["SIINFEKL", "AAAAAAAA"], &a2).unwrap(),
///            VariantScores::Scored(vec![Some(35.0), None]));
/// assert!(matches!(t.score_many(&["SIINFEKL"], &VariantId::from("HLA-B*07:02")).unwrap(),
///                  VariantScores::Unsupported { .. }));
/// ```
#[derive(Clone, Debug, Default)]
pub struct TableOracle {
    scores: HashMap<String, HashMap<String, f64>>,
}

impl TableOracle {
    /// Record one prediction; a later insert for the same pair replaces it.
    pub fn insert(&mut self, allele: &str, peptide: &str, affinity: f64) {
        self.scores
            .entry(allele.to_string())
            .or_default()
            .insert(peptide.to_ascii_uppercase(), affinity);
    }

    /// Alleles present in the table, sorted.
    pub fn alleles(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.scores.keys().map(|s| s.as_str()).collect();
        v.sort_unstable();
        v
    }

    /// Total number of stored predictions.
    pub fn len(&self) -> usize { self.scores.values().map(|m| m.len()).sum() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Load a long-format prediction table (`peptide`, `allele`, affinity column).
    /// Tab-delimited when the file extension is `.tsv`, otherwise comma-delimited.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CoverError> {
        let p = path.as_ref();
        let delim = if p.extension().map(|e| e == "tsv").unwrap_or(false) { b'\t' } else { b',' };
        let file = std::fs::File::open(p)?;
        Self::from_reader(file, delim).map_err(|e| match e {
            CoverError::Format { message, .. } => CoverError::Format { path: p.display().to_string(), message },
            other => other,
        })
    }

    /// Load a prediction table from any reader with the given delimiter.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, CoverError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        let find = |names: &[&str]| headers.iter().position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)));
        let missing = |what: &str| CoverError::Format {
            path: "<reader>".to_string(),
            message: format!("prediction table has no {what} column"),
        };
        let pep_col = find(&["peptide"]).ok_or_else(|| missing("peptide"))?;
        let allele_col = find(&["allele"]).ok_or_else(|| missing("allele"))?;
        let aff_col = find(AFFINITY_COLUMNS).ok_or_else(|| missing("affinity"))?;

        let mut table = TableOracle::default();
        for (i, rec) in rdr.records().enumerate() {
            let r = rec?;
            let (Some(pep), Some(allele), Some(aff)) = (r.get(pep_col), r.get(allele_col), r.get(aff_col)) else {
                continue;
            };
            let affinity: f64 = aff.parse().map_err(|_| CoverError::Format {
                path: "<reader>".to_string(),
                message: format!("row {}: affinity {aff:?} is not a number", i + 2),
            })?;
            table.insert(allele, pep, affinity);
        }
        Ok(table)
    }
}

impl AffinityOracle for TableOracle {
    fn score_many(&self, peptides: &[&str], variant: &VariantId) -> Result<VariantScores, OracleError> {
        let Some(by_peptide) = self.scores.get(variant.as_str()) else {
            return Ok(VariantScores::Unsupported { reason: format!("no predictions for allele {variant}") });
        };
        let mut out = Vec::with_capacity(peptides.len());
        for &pep in peptides {
            if pep.is_empty() || !pep.bytes().all(is_amino_acid) {
                return Err(OracleError::MalformedPeptide {
                    peptide: pep.to_string(),
                    reason: "expected uppercase standard amino acids".to_string(),
                });
            }
            out.push(by_peptide.get(pep).copied());
        }
        Ok(VariantScores::Scored(out))
    }
}
