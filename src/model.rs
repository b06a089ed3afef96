//! Core types for **sequences**, **fragments**, **variants** and **run parameters**.
//!
//! This module holds the data model used across the crate. Inputs
//! ([`Sequence`], [`VariantSet`]) are validated once at construction and are
//! immutable afterwards, so every later stage can rely on their invariants.
//!
//! # Coverage identity
//! A [`Fragment`] is identified by its **offset span**, not by its text: the
//! same short peptide occurring twice in a protein covers two different sets
//! of residues.
use core::fmt;
use std::collections::HashSet;

use crate::error::ConfigError;

/// The 20 standard amino acids accepted in a protein sequence.
pub const AMINO_ACIDS: &str = "ACDEFGHIKLMNPQRSTVWY";

/// Return `true` if `b` is one of the [`AMINO_ACIDS`] (uppercase only).
#[inline]
pub fn is_amino_acid(b: u8) -> bool {
    matches!(
        b,
        b'A' | b'C' | b'D' | b'E' | b'F' | b'G' | b'H' | b'I' | b'K' | b'L'
            | b'M' | b'N' | b'P' | b'Q' | b'R' | b'S' | b'T' | b'V' | b'W' | b'Y'
    )
}

/// A validated, uppercase protein sequence.
///
/// # Examples
/// ```
/// let s = epicover::model::Sequence::new(" acdefg\n").unwrap();
/// assert_eq!(s.as_str(), "ACDEFG");
/// assert!(epicover::model::Sequence::new("ACDXZ").is_err());
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Sequence(String);

impl Sequence {
    /// Trim, upper-case and validate `raw` against [`AMINO_ACIDS`].
    pub fn new(raw: &str) -> Result<Self, ConfigError> {
        let seq = raw.trim().to_ascii_uppercase();
        if seq.is_empty() {
            return Err(ConfigError::EmptySequence);
        }
        if let Some((position, residue)) = seq.char_indices().find(|(_, c)| !c.is_ascii() || !is_amino_acid(*c as u8)) {
            return Err(ConfigError::InvalidResidue { residue, position });
        }
        Ok(Self(seq))
    }

    pub fn as_str(&self) -> &str { &self.0 }

    /// Number of residues.
    pub fn len(&self) -> usize { self.0.len() }

    /// Always `false` for a constructed sequence; kept for API symmetry.
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// A contiguous peptide of a [`Sequence`], tagged with its 0-based start offset.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Fragment {
    /// Peptide text (uppercase amino acids).
    pub peptide: String,
    /// Start offset (0-based) within the parent sequence.
    pub start: usize,
}

impl Fragment {
    /// Peptide length in residues.
    pub fn len(&self) -> usize { self.peptide.len() }

    pub fn is_empty(&self) -> bool { self.peptide.is_empty() }

    /// End offset (exclusive) within the parent sequence.
    pub fn end(&self) -> usize { self.start + self.peptide.len() }

    /// Residue offsets spanned by this fragment.
    pub fn span(&self) -> core::ops::Range<usize> { self.start..self.end() }
}

/// Identifier for a receptor variant, e.g. an HLA allele such as `"HLA-A*02:01"`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct VariantId(pub String);

impl VariantId {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for VariantId {
    fn from(s: &str) -> Self { VariantId(s.to_string()) }
}

/// Ordered set of unique variant identifiers, fixed for a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariantSet {
    ids: Vec<VariantId>,
}

impl VariantSet {
    /// Build a set from identifiers in table order.
    ///
    /// Fails with [`ConfigError::NoVariants`] when empty and with
    /// [`ConfigError::DuplicateVariant`] on the first repeated identifier.
    pub fn new<I, S>(ids: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in ids {
            let id = VariantId(id.into());
            if !seen.insert(id.clone()) {
                return Err(ConfigError::DuplicateVariant(id.0));
            }
            out.push(id);
        }
        if out.is_empty() {
            return Err(ConfigError::NoVariants);
        }
        Ok(Self { ids: out })
    }

    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, VariantId> { self.ids.iter() }

    pub fn as_slice(&self) -> &[VariantId] { &self.ids }

    /// Column index of `id`, if present.
    pub fn index_of(&self, id: &VariantId) -> Option<usize> {
        self.ids.iter().position(|v| v == id)
    }
}

impl<'a> IntoIterator for &'a VariantSet {
    type Item = &'a VariantId;
    type IntoIter = std::slice::Iter<'a, VariantId>;
    fn into_iter(self) -> Self::IntoIter { self.ids.iter() }
}

/// Parameters of a coverage run.
///
/// Defaults are 8–9 residue peptides, a 500 nM affinity cutoff and one
/// credited peptide per variant.
#[derive(Clone, Debug, PartialEq)]
pub struct RunParams {
    /// Shortest peptide length (inclusive).
    pub min_length: usize,
    /// Longest peptide length (inclusive).
    pub max_length: usize,
    /// Maximum predicted affinity (nM, lower binds stronger) that counts as a hit.
    pub kd_threshold: f64,
    /// How many accepted peptides may be credited to one variant.
    pub coverage_limit: usize,
}

impl Default for RunParams {
    fn default() -> Self {
        Self { min_length: 8, max_length: 9, kd_threshold: 500.0, coverage_limit: 1 }
    }
}

impl RunParams {
    /// Check length bounds, threshold and limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_lengths(self.min_length, self.max_length)?;
        validate_selection(self.kd_threshold, self.coverage_limit)
    }
}

pub(crate) fn validate_lengths(min_length: usize, max_length: usize) -> Result<(), ConfigError> {
    if min_length < 1 || min_length > max_length {
        return Err(ConfigError::InvalidLengthRange { min: min_length, max: max_length });
    }
    Ok(())
}

pub(crate) fn validate_selection(kd_threshold: f64, coverage_limit: usize) -> Result<(), ConfigError> {
    if !kd_threshold.is_finite() || kd_threshold <= 0.0 {
        return Err(ConfigError::InvalidThreshold(kd_threshold));
    }
    if coverage_limit < 1 {
        return Err(ConfigError::InvalidCoverageLimit(coverage_limit));
    }
    Ok(())
}

/// Emitted once for every fragment that contributes at least one new,
/// unsaturated variant hit.
#[derive(Clone, Debug, PartialEq)]
pub struct AcceptanceRecord {
    /// The accepted fragment.
    pub fragment: Fragment,
    /// Variants credited to this fragment, in variant-set order.
    pub new_hits: Vec<VariantId>,
    /// `|new_hits| / total_variants * 100`.
    pub absolute_coverage: f64,
    /// Residues first covered by this fragment.
    pub new_positions: usize,
    /// `new_positions / sequence_len * 100`.
    pub sequence_gain: f64,
    /// Variants hit at least once so far, as % of all variants.
    pub cumulative_variant_coverage: f64,
    /// Residues covered so far, as % of the sequence.
    pub cumulative_sequence_coverage: f64,
}
