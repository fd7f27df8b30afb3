use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "custody workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the loom model-checking suite
    Loom {
        /// Upper bound on preemptions explored per model (LOOM_MAX_PREEMPTIONS)
        #[arg(long, default_value_t = 3)]
        max_preemptions: u32,
    },
    /// Run the criterion benchmarks and write a report
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,
    },
}

const BENCH: &str = "ptr_benchmark";

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Loom { max_preemptions } => run_loom(max_preemptions)?,
        Commands::Bench { quick, report_only } => {
            if !report_only {
                run_benchmarks(quick)?;
            }
            generate_report()?;
        }
    }

    Ok(())
}

fn run_loom(max_preemptions: u32) -> Result<()> {
    println!(">>> Running loom models (max preemptions: {})", max_preemptions);
    let start = Instant::now();

    let status = Command::new("cargo")
        .env("RUSTFLAGS", "--cfg loom")
        .env("LOOM_MAX_PREEMPTIONS", max_preemptions.to_string())
        .args(["test", "--release", "--test", "loom_test"])
        .status()
        .context("Failed to run loom tests")?;
    if !status.success() {
        anyhow::bail!("loom models failed");
    }

    println!("Loom models passed in {:.2?}", start.elapsed());
    Ok(())
}

fn run_benchmarks(quick: bool) -> Result<()> {
    println!("Running benchmarks...");
    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.args(["bench", "--bench", BENCH, "--"]);
    if quick {
        cmd.arg("--measurement-time").arg("0.1");
        cmd.arg("--noplot");
        cmd.arg("--sample-size").arg("10");
    }

    let status = cmd.status().context(format!("Failed to run bench {}", BENCH))?;
    if !status.success() {
        anyhow::bail!("Benchmark {} failed", BENCH);
    }
    println!("Finished {} in {:.2?}", BENCH, start.elapsed());
    Ok(())
}

fn generate_report() -> Result<()> {
    println!("\n>>> Generating Report...");
    let criterion_dir = Path::new("target/criterion");
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    // group -> function -> mean time in ns
    let mut results: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    collect_results(criterion_dir, &mut results)?;

    let report_path = Path::new("benchmark_results/report.md");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(report_path)?;

    writeln!(file, "# Handle Benchmark Report")?;
    for (group, functions) in &results {
        writeln!(file, "\n## {}\n", group)?;
        writeln!(file, "| Function | Mean (ns) | vs fastest |")?;
        writeln!(file, "|---|---|---|")?;

        let fastest = functions.values().copied().fold(f64::INFINITY, f64::min);
        for (function, mean) in functions {
            let rel = if fastest > 0.0 { mean / fastest } else { 0.0 };
            writeln!(file, "| {} | {:.2} | **{:.2}x** |", function, mean, rel)?;
        }
    }

    println!("Report written to {}", report_path.display());
    Ok(())
}

fn collect_results(dir: &Path, results: &mut BTreeMap<String, BTreeMap<String, f64>>) -> Result<()> {
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_results(&path, results)?;
            continue;
        }
        if path.file_name().and_then(|s| s.to_str()) != Some("benchmark.json") {
            continue;
        }
        // Only the latest run: .../<group>/<function>/new/benchmark.json
        if path.parent().and_then(Path::file_name).and_then(|s| s.to_str()) != Some("new") {
            continue;
        }

        let bench: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)
            .with_context(|| format!("Malformed {}", path.display()))?;
        let estimates_path = path.with_file_name("estimates.json");
        let estimates: serde_json::Value = serde_json::from_str(&fs::read_to_string(&estimates_path)?)
            .with_context(|| format!("Malformed {}", estimates_path.display()))?;

        let group = bench.get("group_id").and_then(|v| v.as_str());
        let function = bench.get("function_id").and_then(|v| v.as_str());
        let mean = estimates
            .get("mean")
            .and_then(|m| m.get("point_estimate"))
            .and_then(|v| v.as_f64());

        if let (Some(group), Some(function), Some(mean)) = (group, function, mean) {
            results
                .entry(group.to_owned())
                .or_default()
                .insert(function.to_owned(), mean);
        }
    }
    Ok(())
}
