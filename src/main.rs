// ==============================================================================
// main.rs - GRS Tools Entry Point
// ==============================================================================
// Description: Command line interface for GRS filtering and score regression
// Author: Matt Barham
// Created: 2026-09-14
// Modified: 2026-10-18
// Version: 1.2.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grstools::engine::{EngineConfig, StatsEngine};
use grstools::output::{write_variant_table, RegressionReport};
use grstools::parsers::GrsParser;
use grstools::regression::{validate_request, ScoreRegression};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a GRS file and keep variants passing the p-value and MAF thresholds
    Filter(FilterArgs),

    /// Regress a computed GRS on a phenotype
    Regress(RegressArgs),
}

#[derive(clap::Args, Debug)]
struct FilterArgs {
    /// GRS definition file (.gz accepted)
    grs_file: PathBuf,

    /// Keep variants with p-value <= this value
    #[arg(long, env = "GRS_P_THRESHOLD", default_value_t = 1.0)]
    p_threshold: f64,

    /// Keep variants with MAF >= this value (ignored without a maf column)
    #[arg(long, env = "GRS_MAF_THRESHOLD", default_value_t = 0.0)]
    maf_threshold: f64,

    /// Field delimiter of the GRS file, also used for the output
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log the thresholds being applied
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::Args, Debug)]
struct RegressArgs {
    /// Model formula, e.g. "phenotype ~ grs + age"
    #[arg(short, long)]
    model: String,

    /// Statistical test: linear or logistic
    #[arg(short, long)]
    test: String,

    /// Computed GRS file (comma-delimited, indexed by "sample")
    #[arg(long)]
    grs: PathBuf,

    /// Phenotypes file
    #[arg(long)]
    phenotypes: PathBuf,

    /// Sample identifier column of the phenotypes file
    #[arg(long, env = "GRS_SAMPLE_COLUMN", default_value = "sample")]
    sample_column: String,

    /// Field delimiter of the phenotypes file
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    phenotype_delimiter: u8,

    /// Phenotype cell read as missing; repeat for several tokens
    /// (replaces the defaults: empty, NA, NaN, nan)
    #[arg(long = "missing-value", value_name = "TOKEN")]
    missing_values: Vec<String>,

    /// Coverage of the reported confidence interval
    #[arg(long, default_value_t = 0.95)]
    confidence_level: f64,

    /// Output file for the JSON report (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Accepts a single ASCII character, or "tab" / "\t" / "space"
fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        "space" => Ok(b' '),
        _ => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Ok(c as u8),
                _ => Err(format!("delimiter must be a single ASCII character, got '{}'", value)),
            }
        }
    }
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {:?}", path))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout().lock())),
    }
}

fn run_filter(args: FilterArgs) -> Result<()> {
    let parser = GrsParser::with_thresholds(args.p_threshold, args.maf_threshold)
        .delimiter(args.delimiter)
        .verbose(args.verbose);

    let table = parser
        .parse(&args.grs_file)
        .with_context(|| format!("Failed to parse GRS file {:?}", args.grs_file))?;

    info!("{} variants passed the thresholds", table.len());

    let output = open_output(args.output.as_ref())?;
    write_variant_table(&table, output, args.delimiter)
}

fn run_regress(args: RegressArgs) -> Result<()> {
    // Fail on configuration problems before reading anything
    let (_, test) = validate_request(&args.model, &args.test)?;

    let engine = StatsEngine::with_config(EngineConfig {
        confidence_level: args.confidence_level,
        ..EngineConfig::default()
    });

    let mut regression = ScoreRegression::new(&engine)
        .sample_column(args.sample_column.clone())
        .phenotype_delimiter(args.phenotype_delimiter);
    if !args.missing_values.is_empty() {
        regression = regression.missing_values(args.missing_values.clone());
    }

    let result = regression
        .regress(&args.model, &args.test, &args.grs, &args.phenotypes)
        .context("GRS regression failed")?;

    info!(
        "beta = {:.6}, CI = [{:.6}, {:.6}], p = {:.3e}",
        result.beta, result.ci.0, result.ci.1, result.p_value
    );

    let report = RegressionReport::new(&args.model, test, &args.grs, &args.phenotypes, result)?;

    let mut output = open_output(args.output.as_ref())?;
    writeln!(output, "{}", report.to_json()?)?;
    output.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    // Logs go to stderr, results to stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grstools=info,grs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Filter(args) => run_filter(args),
        Command::Regress(args) => run_regress(args),
    }
}
