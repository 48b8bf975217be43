//! rsmltrack CLI: select, parse and reconcile one directory of RSML candidates.
//!
//! Usage:
//!   rsmltrack <DIR> [--strategy S] [--fallback S] [--metric M]
//!             [--no-repair-output] [--sequential] [--output DIR] [-v]

use clap::Parser;
use rsmltrack::pipeline::{Pipeline, TrackingRun};
use rsmltrack::rsml::write_rsml_file;
use rsmltrack::selection::{CandidateResolver, SelectionStrategy};
use rsmltrack::tracking::{IdentityResolver, MatchingMetric};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rsmltrack",
    version,
    about = "Reconcile root identities across a series of RSML snapshots"
)]
struct Cli {
    /// Directory holding the candidate RSML files
    directory: PathBuf,
    /// Strategy selecting one candidate per time point
    #[arg(long, default_value_t = SelectionStrategy::MostComplexity)]
    strategy: SelectionStrategy,
    /// Strategy breaking ties left by --strategy
    #[arg(long, default_value_t = SelectionStrategy::LastVersion)]
    fallback: SelectionStrategy,
    /// Metric matching roots across time points
    #[arg(long, default_value_t = MatchingMetric::Dtw)]
    metric: MatchingMetric,
    /// Keep repaired candidates in memory instead of writing them
    #[arg(long)]
    no_repair_output: bool,
    /// Resolve candidates and match roots on the current thread only
    #[arg(long)]
    sequential: bool,
    /// Directory to write the reconciled RSML files to
    #[arg(long)]
    output: Option<PathBuf>,
    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let run = match run_pipeline(&cli) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    print_summary(&run);

    if let Some(output) = &cli.output {
        if let Err(e) = write_series(&run, output) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run_pipeline(cli: &Cli) -> rsmltrack::Result<TrackingRun> {
    let candidates = CandidateResolver::for_directory(&cli.directory)?
        .with_strategy(cli.strategy)
        .with_fallback(cli.fallback)
        .with_repair_output(!cli.no_repair_output)
        .with_parallelism(!cli.sequential);
    let identity = IdentityResolver::new()
        .with_metric(cli.metric)
        .with_parallel_matching(!cli.sequential);

    Pipeline::new(candidates).with_identity_resolver(identity).run()
}

fn print_summary(run: &TrackingRun) {
    println!("Selected candidates:");
    for (key, selected) in &run.resolution.selected {
        let repaired = if selected.repaired { " (repaired)" } else { "" };
        println!("  {key}: {}{repaired}", selected.candidate.path().display());
    }

    if !run.dropped.is_empty() {
        println!("Dropped time points:");
        for dropped in &run.dropped {
            match dropped.date {
                Some(date) => println!("  {} ({date}): {:?}", dropped.key, dropped.reason),
                None => println!("  {}: {:?}", dropped.key, dropped.reason),
            }
        }
    }

    let report = &run.report;
    println!("Time points: {}", run.series.len());
    println!("Well classified roots: {}", report.well_classified);
    println!("Misclassified roots: {}", report.misclassified);
    println!("Last-time-only identifiers: {}", report.last_time_only);
    println!("Renamed roots: {}", report.renamed);
    if report.anonymized {
        println!("Input identifiers looked anonymized");
    }
}

fn write_series(run: &TrackingRun, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(output)?;
    for snapshot in run.series.values() {
        let path = output.join(format!("{}.rsml", snapshot.key()));
        write_rsml_file(&path, snapshot)?;
    }
    println!("Wrote {} reconciled files to {}", run.series.len(), output.display());
    Ok(())
}
