//! Peptide enumeration.
//!
//! Every contiguous window of the protein with a length inside
//! `[min_length, max_length]` becomes a [`Fragment`]. Output order is start
//! offset ascending, then length ascending; the greedy selector depends on it.
//!
//! # Examples
//! ```
//! use epicover::fragments::generate;
//! use epicover::model::Sequence;
//! let seq = Sequence::new("ACDEFGHIK").unwrap();
//! let frags = generate(&seq, 3, 3).unwrap();
//! assert_eq!(frags.len(), 7);
//! assert_eq!(frags[6].peptide, "HIK");
//! ```
use crate::error::ConfigError;
use crate::model::{validate_lengths, Fragment, Sequence};

/// Enumerate all peptides of `seq` with lengths in `[min_length, max_length]`.
///
/// Windows that would run past the end of the sequence are not produced, so a
/// sequence shorter than `min_length` yields no fragments.
pub fn generate(seq: &Sequence, min_length: usize, max_length: usize) -> Result<Vec<Fragment>, ConfigError> {
    validate_lengths(min_length, max_length)?;
    let s = seq.as_str();
    let n = s.len();
    let mut out = Vec::with_capacity(expected_count(n, min_length, max_length));
    for start in 0..n {
        let longest = max_length.min(n - start);
        for len in min_length..=longest {
            out.push(Fragment { peptide: s[start..start + len].to_string(), start });
        }
    }
    Ok(out)
}

/// Number of fragments [`generate`] will produce for a sequence of length `n`.
pub fn expected_count(n: usize, min_length: usize, max_length: usize) -> usize {
    (min_length..=max_length)
        .map(|len| if len <= n { n - len + 1 } else { 0 })
        .sum()
}
