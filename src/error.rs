//! Error types.
//!
//! [`ConfigError`] and [`OracleError`] are the two fatal categories of a run.
//! A variant the oracle does not support is *not* an error; see
//! [`crate::oracle::VariantScores::Unsupported`].

/// Invalid run input, surfaced before any processing starts.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Returned if `min_length` > `max_length` or `min_length` is 0.
    #[error("invalid peptide length range: min_length={min}, max_length={max}")]
    InvalidLengthRange { min: usize, max: usize },
    /// Returned if the Kd threshold is not a positive finite number.
    #[error("kd threshold must be > 0 (got {0})")]
    InvalidThreshold(f64),
    /// Returned if the coverage limit is 0.
    #[error("coverage limit must be >= 1 (got {0})")]
    InvalidCoverageLimit(usize),
    #[error("variant set is empty")]
    NoVariants,
    #[error("duplicate variant identifier: {0}")]
    DuplicateVariant(String),
    #[error("protein sequence is empty")]
    EmptySequence,
    #[error("invalid amino acid {residue:?} at position {position}")]
    InvalidResidue { residue: char, position: usize },
}

/// The affinity oracle failed for a reason other than an unsupported variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("peptide {peptide:?} cannot be scored: {reason}")]
    MalformedPeptide { peptide: String, reason: String },
    #[error("oracle returned {got} scores for {expected} peptides (variant {variant})")]
    BatchLength { variant: String, expected: usize, got: usize },
    #[error("oracle failed for variant {variant}: {message}")]
    Failed { variant: String, message: String },
}

/// Umbrella error for the pipeline and its file readers.
#[derive(thiserror::Error, Debug)]
pub enum CoverError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("{path}: {message}")]
    Format { path: String, message: String },
}
