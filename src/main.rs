//! Falba command line interface

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use falba::compare::{compare, ComparisonRequest};
use falba::import::import_result;
use falba::query::Predicate;
use falba::storage::export_parquet;
use falba::{Database, Pipeline};

/// Falba - benchmark result database with controlled A/B comparison
///
/// # Examples
///
/// ```bash
/// # Import a run's output files
/// falba import fio ./out/fio_output_1.json ./out/etc_os-release
///
/// # Compare a metric across one fact, pinning another
/// falba compare os_release_variant_id fio_randread_read_iops --fact-eq kernel_version=6.1
///
/// # Which results were instrumented on 6.x kernels?
/// falba filter "instrumented AND kernel_version >= '6'"
/// ```
#[derive(Parser)]
#[command(name = "falba")]
#[command(author, version, about = "Benchmark result database with controlled A/B comparison", long_about = None)]
struct Cli {
    /// Result store directory
    #[arg(long, global = true, env = "FALBA_DB", default_value = "./results")]
    result_db: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List results
    Ls,

    /// List metric names and the tests that report them
    Metrics,

    /// Show one result's facts and metrics
    Show {
        /// Result directory name (test_name:result_id)
        dirname: String,
    },

    /// Import files and directories as a new result
    Import {
        /// Test name
        test_name: String,
        /// Artifact files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Compare a metric across the values of one fact
    Compare {
        /// Fact expected to be the only difference between groups
        experiment_fact: String,
        /// Metric to compare
        metric: String,
        /// Restrict to one test
        #[arg(long)]
        test: Option<String>,
        /// Require FACT=VALUE (repeatable)
        #[arg(long = "fact-eq", value_name = "FACT=VALUE", value_parser = parse_key_value)]
        fact_eq: Vec<(String, String)>,
        /// Accept variation in this fact (repeatable)
        #[arg(long, value_name = "FACT")]
        ignore: Vec<String>,
        /// Histogram buckets
        #[arg(long)]
        plot_width: Option<usize>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List results matching a predicate over their facts
    Filter {
        /// Expression, e.g. "kernel_version = '6.1' AND nproc >= 8"
        expr: String,
    },

    /// Export the flat table as Parquet
    Export {
        /// Output file
        output: PathBuf,
    },
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected FACT=VALUE, got {s:?}"))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "falba=debug" } else { "falba=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(root: &Path) -> Result<Database> {
    Database::load(root, &Pipeline::builtin()?)
        .with_context(|| format!("failed to load result database {}", root.display()))
}

fn run(cli: Cli) -> Result<()> {
    let root = cli.result_db.as_path();
    match cli.command {
        Commands::Ls => {
            let db = load(root)?;
            for result in db.results() {
                println!(
                    "{}  facts={} metrics={} artifacts={}",
                    result.dirname(),
                    result.facts().len(),
                    result.metrics().len(),
                    result.artifacts().len()
                );
            }
        }
        Commands::Metrics => {
            let db = load(root)?;
            for metric in db.metric_names() {
                let tests: Vec<&str> = db
                    .results()
                    .iter()
                    .filter(|r| r.metrics().iter().any(|m| m.name() == metric))
                    .map(falba::model::BenchResult::test_name)
                    .collect::<std::collections::BTreeSet<_>>()
                    .into_iter()
                    .collect();
                println!("{metric}  ({})", tests.join(", "));
            }
        }
        Commands::Show { dirname } => {
            let db = load(root)?;
            let result = db
                .result(&dirname)
                .with_context(|| format!("no result named {dirname}"))?;
            println!("{}", result.dirname());
            println!("facts:");
            for fact in result.facts().values() {
                let producer = result
                    .provenance()
                    .producer_of(fact.name())
                    .map_or("?", |p| p.producer.as_str());
                match fact.unit() {
                    Some(unit) => println!("  {} = {} {unit}  [{producer}]", fact.name(), fact.value()),
                    None => println!("  {} = {}  [{producer}]", fact.name(), fact.value()),
                }
            }
            println!("metrics:");
            let mut counts = std::collections::BTreeMap::<&str, usize>::new();
            for metric in result.metrics() {
                *counts.entry(metric.name()).or_default() += 1;
            }
            for (name, count) in counts {
                println!("  {name}: {count} sample(s)");
            }
        }
        Commands::Import { test_name, paths } => {
            let imported = import_result(root, &test_name, &paths)
                .with_context(|| format!("failed to import {test_name}"))?;
            println!("{}", imported.dirname());
        }
        Commands::Compare {
            experiment_fact,
            metric,
            test,
            fact_eq,
            ignore,
            plot_width,
            json,
        } => {
            let db = load(root)?;
            let mut request = ComparisonRequest::new(experiment_fact, metric);
            if let Some(test) = test {
                request = request.test(test);
            }
            for (fact, value) in fact_eq {
                request = request.fact_eq(fact, value);
            }
            for fact in ignore {
                request = request.ignore(fact);
            }
            if let Some(width) = plot_width {
                request = request.plot_width(width);
            }
            let comparison = compare(&db, &request)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&comparison)?);
            } else {
                println!("{}", comparison.render());
            }
        }
        Commands::Filter { expr } => {
            let db = load(root)?;
            let predicate = Predicate::parse(&expr)?;
            for result in db.filter(&predicate)? {
                println!("{}", result.dirname());
            }
        }
        Commands::Export { output } => {
            let db = load(root)?;
            export_parquet(&db.flat_table(), &output)
                .with_context(|| format!("failed to export to {}", output.display()))?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
