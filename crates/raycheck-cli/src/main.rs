//! raycheck - regression harness for the `ray` renderer.
//!
//! Renders every `.ray` scene under the scene directory with both a trusted
//! reference binary and the candidate under test, compares the images by RMS
//! pixel error, and prints a per-scene verdict. Reference renders are cached
//! and invalidated when the reference binary changes.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::Level;

use raycheck_core::{Harness, HarnessConfig, Outcome, RunSummary, SceneReport};

mod telemetry;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

#[derive(Parser)]
#[command(name = "raycheck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Regression harness for the ray renderer", long_about = None)]
struct Cli {
    /// Candidate renderer executable
    #[arg(long, default_value = "build/bin/ray")]
    exec: PathBuf,

    /// Trusted reference renderer executable
    #[arg(long = "ref", default_value = "ray-solution")]
    reference: PathBuf,

    /// Directory searched recursively for .ray scene files
    #[arg(long, default_value = "assets/scenes")]
    scenes: PathBuf,

    /// Output directory for renders, the reference cache, and captured stdio
    #[arg(long, default_value = "raycheck.out")]
    out: PathBuf,

    /// Per-scene time limit for the candidate, in seconds
    #[arg(long, default_value_t = 180)]
    timelimit: u64,

    /// Maximum allowed root-mean-square pixel error
    #[arg(long, default_value_t = 10.0)]
    maxrms: f64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit the summary and log lines as JSON
    #[arg(long, global = true)]
    json: bool,
}

fn print_report(report: &SceneReport) {
    match &report.outcome {
        Outcome::Pass { rms } => {
            println!("{BOLD}{GREEN}[PASS]{RESET} {} RMS: {rms}", report.scene);
        }
        Outcome::Warning { rms } => {
            println!("{BOLD}{YELLOW}[WARNING]{RESET} {} RMS: {rms}", report.scene);
        }
        Outcome::Error { message } => {
            println!("{BOLD}{RED}[ERROR]{RESET} {} {message}", report.scene);
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "{BOLD}{} scenes: {} passed, {} warned, {} errored{RESET}",
        summary.reports.len(),
        summary.passed(),
        summary.warned(),
        summary.errored()
    );
    if let Some(worst) = summary.worst_rms() {
        println!("worst RMS: {worst}");
    }
    if summary.cache_invalidated {
        println!("reference cache was regenerated this run");
    }
}

fn print_json_summary(summary: &RunSummary) -> anyhow::Result<()> {
    let value = serde_json::json!({
        "scenes": summary.reports,
        "passed": summary.passed(),
        "warned": summary.warned(),
        "errored": summary.errored(),
        "worst_rms": summary.worst_rms(),
        "cache_invalidated": summary.cache_invalidated,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    telemetry::init_tracing(cli.json, level);

    let config = HarnessConfig {
        candidate_exe: cli.exec,
        reference_exe: cli.reference,
        scene_root: cli.scenes,
        out_root: cli.out,
        time_limit: Duration::from_secs(cli.timelimit),
        max_rms: cli.maxrms,
    };

    let json = cli.json;
    let summary = Harness::new(config)
        .run_with(|report| {
            if !json {
                print_report(report);
            }
        })
        .await
        .context("harness run failed")?;

    if json {
        print_json_summary(&summary)?;
    } else {
        print_summary(&summary);
    }

    Ok(())
}
