use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};

use epicover::model::{RunParams, Sequence};
use epicover::oracle::TableOracle;

/// Epicover CLI
#[derive(Parser)]
#[command(name = "epicover")]
#[command(version)]
#[command(about = "Greedy peptide selection for HLA allele and sequence coverage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the protein sequence comes from.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct SequenceInput {
    /// Protein sequence given inline
    #[arg(long)]
    sequence: Option<String>,
    /// FASTA or plain-text file holding the protein sequence
    #[arg(long)]
    fasta: Option<String>,
}

impl SequenceInput {
    fn load(&self) -> anyhow::Result<Sequence> {
        match (&self.sequence, &self.fasta) {
            (Some(s), _) => Ok(Sequence::new(s)?),
            (None, Some(path)) => {
                epicover::io::read_sequence(path).with_context(|| format!("reading sequence from {path}"))
            }
            (None, None) => bail!("either --sequence or --fasta is required"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List every peptide generated from a sequence
    Fragments {
        #[command(flatten)]
        input: SequenceInput,
        /// Minimum peptide length
        #[arg(long, default_value_t = 8)]
        min_length: usize,
        /// Maximum peptide length
        #[arg(long, default_value_t = 9)]
        max_length: usize,
    },

    /// Select peptides covering the alleles of a variant table
    Select {
        #[command(flatten)]
        input: SequenceInput,
        /// Table whose column headers are the HLA alleles (CSV, or TSV by extension)
        #[arg(long)]
        variants: String,
        /// Prediction table with peptide, allele and affinity columns
        #[arg(long)]
        affinities: String,
        /// Minimum peptide length
        #[arg(long, default_value_t = 8)]
        min_length: usize,
        /// Maximum peptide length
        #[arg(long, default_value_t = 9)]
        max_length: usize,
        /// Affinity threshold in nM (lower binds stronger)
        #[arg(long, default_value_t = 500.0)]
        kd_threshold: f64,
        /// Peptides that may be credited to one allele
        #[arg(long, default_value_t = 1)]
        coverage_limit: usize,
        /// Threads for affinity scoring (None = all)
        #[arg(long)]
        threads: Option<usize>,
        /// Write records as CSV to this file ("-" for stdout) instead of a table
        #[arg(long)]
        csv: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fragments { input, min_length, max_length } => {
            let seq = input.load()?;
            let frags = epicover::fragments::generate(&seq, min_length, max_length)?;
            for f in frags {
                println!("{}\t{}\t{}", f.start, f.len(), f.peptide);
            }
        }

        Commands::Select {
            input,
            variants,
            affinities,
            min_length,
            max_length,
            kd_threshold,
            coverage_limit,
            threads,
            csv,
        } => {
            let params = RunParams { min_length, max_length, kd_threshold, coverage_limit };
            params.validate()?;
            let seq = input.load()?;
            let variant_set = epicover::io::read_variant_table(&variants)
                .with_context(|| format!("reading variant table {variants}"))?;
            let oracle = TableOracle::from_path(&affinities)
                .with_context(|| format!("reading prediction table {affinities}"))?;

            let run = epicover::run_coverage(&seq, &variant_set, &oracle, &params, threads)?;
            cmd_print_records(&run.records, csv.as_deref())?;

            let summary = epicover::metrics::CoverageSummary::from_ledger(&run.ledger);
            eprintln!(
                "run completed, {} variants skipped: {} peptides selected from {}, {}/{} alleles ({:.2}%), {}/{} residues ({:.2}%)",
                run.build.skipped.len(),
                run.records.len(),
                run.fragments,
                summary.covered_variants,
                summary.total_variants,
                summary.variant_coverage,
                summary.covered_residues,
                summary.sequence_len,
                summary.sequence_coverage,
            );
            for (variant, reason) in &run.build.skipped {
                eprintln!("skipped {variant}: {reason}");
            }
        }
    }

    Ok(())
}

fn cmd_print_records(records: &[epicover::model::AcceptanceRecord], csv: Option<&str>) -> anyhow::Result<()> {
    match csv {
        Some("-") => epicover::report::write_csv(records, std::io::stdout())?,
        Some(path) => {
            let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
            epicover::report::write_csv(records, file)?;
        }
        None => {
            let df = epicover::report::records_frame(records)?;
            // These env vars are read by Polars' pretty-printer.
            std::env::set_var("POLARS_FMT_TABLE_FORMATTING", "UTF8_FULL");
            std::env::set_var("POLARS_FMT_MAX_COLS", "100");
            std::env::set_var("POLARS_FMT_MAX_ROWS", "1000000");
            std::env::set_var("POLARS_FMT_STR_LEN", "200");
            println!("{}", df);
        }
    }
    Ok(())
}
