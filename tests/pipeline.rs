use std::io::Write;

use epicover::metrics::{coverage_curve, CoverageSummary};
use epicover::model::{RunParams, VariantId};
use epicover::oracle::TableOracle;
use rstest::{fixture, rstest};
use tempfile::NamedTempFile;

const PROTEIN: &str = ">sp|TEST|demo protein\nMKTAYIAKQR\nQISFVKSHFS\nRQ\n";

const ALLELES: &str = "HLA-A*01:01,HLA-A*02:01,HLA-B*07:02,HLA-C*07:01\n";

fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

#[fixture]
fn fasta() -> NamedTempFile {
    write_temp(".fasta", PROTEIN)
}

#[fixture]
fn variants() -> NamedTempFile {
    write_temp(".csv", ALLELES)
}

/// Prediction table: HLA-C*07:01 is absent, so the oracle treats it as unsupported.
#[fixture]
fn predictions() -> NamedTempFile {
    let rows = [
        ("MKTAYIAKQ", "HLA-A*01:01", 120.0),
        ("MKTAYIAKQ", "HLA-A*02:01", 9000.0),
        ("KTAYIAKQR", "HLA-A*02:01", 80.0),
        ("KTAYIAKQR", "HLA-A*01:01", 30.0),
        ("AKQRQISFV", "HLA-A*02:01", 15.0),
        ("AKQRQISFV", "HLA-B*07:02", 700.0),
        ("FVKSHFSRQ", "HLA-B*07:02", 250.0),
        ("SFVKSHFSR", "HLA-B*07:02", 40.0),
    ];
    let mut text = String::from("peptide\tallele\tmhcflurry_affinity\n");
    for (p, a, k) in rows {
        text.push_str(&format!("{p}\t{a}\t{k}\n"));
    }
    write_temp(".tsv", &text)
}

fn load(fasta: &NamedTempFile, variants: &NamedTempFile, predictions: &NamedTempFile) -> (epicover::model::Sequence, epicover::model::VariantSet, TableOracle) {
    (
        epicover::io::read_sequence(fasta.path()).unwrap(),
        epicover::io::read_variant_table(variants.path()).unwrap(),
        TableOracle::from_path(predictions.path()).unwrap(),
    )
}

#[rstest]
fn files_load(fasta: NamedTempFile, variants: NamedTempFile, predictions: NamedTempFile) {
    let (seq, vars, oracle) = load(&fasta, &variants, &predictions);
    assert_eq!(seq.as_str(), "MKTAYIAKQRQISFVKSHFSRQ");
    assert_eq!(vars.len(), 4);
    assert_eq!(oracle.alleles().len(), 3);
}

#[rstest]
fn greedy_walk_with_limit_one(fasta: NamedTempFile, variants: NamedTempFile, predictions: NamedTempFile) {
    let (seq, vars, oracle) = load(&fasta, &variants, &predictions);
    let run = epicover::run_coverage(&seq, &vars, &oracle, &RunParams::default(), Some(2)).unwrap();

    assert_eq!(run.build.skipped.len(), 1);
    assert_eq!(run.build.skipped[0].0, VariantId::from("HLA-C*07:01"));

    let peptides: Vec<&str> = run.records.iter().map(|r| r.fragment.peptide.as_str()).collect();
    // KTAYIAKQR also binds A*01:01, but only A*02:01 is credited to it.
    // AKQRQISFV is above threshold for B*07:02; FVKSHFSRQ comes after SFVKSHFSR saturates it.
    assert_eq!(peptides, vec!["MKTAYIAKQ", "KTAYIAKQR", "SFVKSHFSR"]);
    assert_eq!(run.records[0].new_hits, vec![VariantId::from("HLA-A*01:01")]);
    assert_eq!(run.records[1].new_hits, vec![VariantId::from("HLA-A*02:01")]);
    assert_eq!(run.records[2].new_hits, vec![VariantId::from("HLA-B*07:02")]);
    assert_eq!(run.records[2].cumulative_variant_coverage, 75.0);
    assert_eq!(run.ledger.covered_position_count(), 10 + 9);
}

#[rstest]
#[case(1, 3)]
#[case(2, 4)]
#[case(3, 5)]
fn higher_limits_accept_more(
    fasta: NamedTempFile,
    variants: NamedTempFile,
    predictions: NamedTempFile,
    #[case] limit: usize,
    #[case] expected: usize,
) {
    let (seq, vars, oracle) = load(&fasta, &variants, &predictions);
    let params = RunParams { coverage_limit: limit, kd_threshold: 1000.0, ..RunParams::default() };
    let run = epicover::run_coverage(&seq, &vars, &oracle, &params, Some(1)).unwrap();
    assert_eq!(run.records.len(), expected);
    assert!(run.ledger.accept_counts().all(|(_, n)| n <= limit));

    let pts: Vec<_> = coverage_curve(&run.records).collect();
    for w in pts.windows(2) {
        assert!(w[0].sequence_coverage <= w[1].sequence_coverage);
        assert!(w[0].variant_coverage <= w[1].variant_coverage);
    }
    let summary = CoverageSummary::from_ledger(&run.ledger);
    assert_eq!(summary.uncovered, vec![VariantId::from("HLA-C*07:01")]);
}

#[rstest]
fn csv_report_round_trip(fasta: NamedTempFile, variants: NamedTempFile, predictions: NamedTempFile) {
    let (seq, vars, oracle) = load(&fasta, &variants, &predictions);
    let run = epicover::run_coverage(&seq, &vars, &oracle, &RunParams::default(), Some(1)).unwrap();
    let out = NamedTempFile::new().unwrap();
    epicover::report::write_csv(&run.records, std::fs::File::create(out.path()).unwrap()).unwrap();
    let text = std::fs::read_to_string(out.path()).unwrap();
    assert_eq!(text.lines().count(), run.records.len() + 1);
    assert!(text.lines().nth(1).unwrap().starts_with("MKTAYIAKQ,0,9,"));
}
