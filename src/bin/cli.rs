//! squeezebench CLI - benchmark external compressors over a corpus
//!
//! Usage:
//!   squeezebench run --corpus <dir> [OPTIONS]
//!   squeezebench list [--algos <list>] [--levels <list>]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use squeezebench::{
    Aggregator, BenchConfig, BenchError, Corpus, HardwareInfo, Pipeline, Progress, ReportMeta,
    config, write_reports,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};
use sysinfo::System;
use tracing_subscriber::EnvFilter;

/// Benchmark gzip, bzip2, xz and zstd over a reference corpus
#[derive(Parser)]
#[command(name = "squeezebench")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmark matrix and write CSV and HTML reports
    Run {
        /// Directory containing the extracted corpus
        #[arg(short, long)]
        corpus: PathBuf,

        /// Directory for compressed and decompressed artifacts
        #[arg(short, long)]
        work_dir: Option<PathBuf>,

        /// Directory receiving the reports
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Codec families or labels, comma-separated (overrides BENCH_ALGOS)
        #[arg(short, long)]
        algos: Option<String>,

        /// Levels for family selectors, comma-separated (overrides BENCH_LEVELS)
        #[arg(short, long)]
        levels: Option<String>,

        /// Keep artifacts in the work directory
        #[arg(short, long)]
        keep_artifacts: bool,

        /// Also write a JSON export
        #[arg(short, long)]
        json: bool,

        /// Measure each file/algorithm pair this many times
        #[arg(short, long, default_value_t = 1)]
        repeat: usize,

        /// Suppress output except errors
        #[arg(short, long)]
        quiet: bool,
    },
    /// Show the configured matrix and whether each binary is installed
    List {
        /// Codec families or labels, comma-separated
        #[arg(short, long)]
        algos: Option<String>,

        /// Levels for family selectors, comma-separated
        #[arg(short, long)]
        levels: Option<String>,
    },
}

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_MISSING_BINARY: i32 = 3;
const EXIT_NO_CORPUS: i32 = 4;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            corpus,
            work_dir,
            output,
            algos,
            levels,
            keep_artifacts,
            json,
            repeat,
            quiet,
        } => {
            build_config(corpus, algos, levels).and_then(|mut config| {
                if let Some(dir) = work_dir {
                    config.work_dir = dir;
                }
                if let Some(dir) = output {
                    config.output_dir = dir;
                }
                config.keep_artifacts = keep_artifacts;
                config.json = json;
                config.repeats = repeat;
                handle_run(&config, quiet)
            })
        }
        Commands::List { algos, levels } => {
            build_config(PathBuf::from("."), algos, levels).and_then(|config| handle_list(&config))
        }
    };

    match result {
        Ok(()) => process::exit(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".bright_red().bold(), e);

            let exit_code = match e.downcast_ref::<BenchError>() {
                Some(BenchError::MissingBinary(_)) => EXIT_MISSING_BINARY,
                Some(BenchError::Corpus(_)) => EXIT_NO_CORPUS,
                _ => EXIT_ERROR,
            };

            process::exit(exit_code);
        }
    }
}

/// CLI flags take precedence over the environment, field by field.
fn build_config(
    corpus: PathBuf,
    algos: Option<String>,
    levels: Option<String>,
) -> Result<BenchConfig> {
    if algos.is_none() && levels.is_none() {
        return Ok(BenchConfig::from_env(corpus)?);
    }

    let algos = algos.or_else(|| std::env::var(config::ENV_ALGOS).ok());
    let levels = levels.or_else(|| std::env::var(config::ENV_LEVELS).ok());
    Ok(BenchConfig::new(corpus).with_filters(algos.as_deref(), levels.as_deref())?)
}

fn handle_run(config: &BenchConfig, quiet: bool) -> Result<()> {
    let started = Instant::now();

    if !quiet {
        println!("{} Checking binaries...", "Step 1/4:".bright_cyan());
    }
    config.check_binaries()?;

    if !quiet {
        println!("{} Scanning corpus...", "Step 2/4:".bright_cyan());
    }
    let corpus = Corpus::open(&config.corpus_dir)?;
    config.prepare_dirs()?;

    let total = corpus.len() * config.algorithms.len() * config.repeats.max(1);
    if !quiet {
        println!(
            "{} {} files ({}), {} configurations",
            "Corpus:".bright_cyan(),
            corpus.len(),
            format_bytes(corpus.total_bytes()),
            config.algorithms.len()
        );
        println!("{} Running {} benchmarks...", "Step 3/4:".bright_cyan(), total);
    }

    let pipeline = Pipeline::from_config(config);
    let aggregator = pipeline.run(&corpus, |p| {
        if !quiet {
            print_progress(&p);
        }
    });

    if !quiet {
        println!();
        println!("{} Writing reports...", "Step 4/4:".bright_cyan());
    }

    let meta = ReportMeta {
        generated_at: chrono::Utc::now()
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        corpus: corpus.root().display().to_string(),
        hardware: Some(collect_hardware_info()),
        failed_runs: aggregator.failures().len(),
    };
    let paths = write_reports(config, &meta, &aggregator).context("Failed to write reports")?;

    if aggregator.runs().is_empty() {
        eprintln!(
            "{} No benchmark produced a measurement ({} failures)",
            "Warning:".bright_yellow().bold(),
            aggregator.failures().len()
        );
    }

    if !quiet {
        print_summary(&aggregator);
        println!();
        println!(
            "{} Wrote {} and {}",
            "Success:".bright_green().bold(),
            paths.csv.display(),
            paths.html.display()
        );
        if let Some(json) = &paths.json {
            println!("   JSON export: {}", json.display());
        }
        println!("   Benchmark took {}", format_duration(started.elapsed()));
    }

    Ok(())
}

fn handle_list(config: &BenchConfig) -> Result<()> {
    println!("{}", "Configured algorithms:".bright_cyan());
    for algo in &config.algorithms {
        println!(
            "   {:<10} {}  |  {}",
            algo.label,
            algo.compress,
            algo.decompress
        );
    }

    println!();
    println!("{}", "Binaries:".bright_cyan());
    for program in config.programs() {
        if config::is_available(program) {
            println!("   {} {}", "✓".bright_green(), program);
        } else {
            println!("   {} {} (not found)", "✗".bright_red(), program);
        }
    }

    Ok(())
}

fn print_progress(progress: &Progress<'_>) {
    match progress.result {
        Ok(run) => {
            print!(
                "\r   [{}/{}] {:<24} {:<8} ratio {}   ",
                progress.index,
                progress.total,
                truncate(&run.file, 24),
                run.algorithm,
                squeezebench::report::fmt_opt(run.ratio, 2)
            );
            if !run.verified {
                println!();
                eprintln!(
                    "   {} {} round trip mismatch for {}",
                    "⚠".bright_yellow(),
                    run.algorithm,
                    run.file
                );
            }
        }
        Err(failure) => {
            println!();
            eprintln!("   {} {}", "⚠".bright_yellow(), failure);
        }
    }
    io::stdout().flush().ok();
}

fn print_summary(aggregator: &Aggregator) {
    println!();
    println!("{}", "Average metrics (by mean ratio):".bright_cyan());
    println!(
        "   {:<10} {:>5} {:>8} {:>12} {:>12}",
        "Algorithm", "Runs", "Ratio", "Comp MB/s", "Decomp MB/s"
    );
    for s in aggregator.summarize() {
        println!(
            "   {:<10} {:>5} {:>8} {:>12} {:>12}",
            s.algorithm,
            s.runs,
            squeezebench::report::fmt_opt(s.avg_ratio, 2),
            squeezebench::report::fmt_opt(s.avg_compress_mbps, 2),
            squeezebench::report::fmt_opt(s.avg_decompress_mbps, 2)
        );
    }

    println!();
    println!("{}", "Totals (by overall ratio):".bright_cyan());
    for s in aggregator.totals() {
        println!(
            "   {:<10} {:>12} -> {:>12}  {}",
            s.algorithm,
            format_bytes(s.total_original_bytes),
            format_bytes(s.total_compressed_bytes),
            squeezebench::report::fmt_opt(s.overall_ratio, 2)
        );
    }

    let unverified = aggregator.unverified().count();
    if unverified > 0 {
        println!();
        println!(
            "{} {} runs failed round-trip verification (still included above)",
            "Warning:".bright_yellow().bold(),
            unverified
        );
    }
}

fn collect_hardware_info() -> HardwareInfo {
    let mut sys = System::new_all();
    sys.refresh_all();

    let cpu_brand = sys
        .cpus()
        .first()
        .map(|cpu| cpu.brand().to_string())
        .unwrap_or_else(|| "Unknown CPU".to_string());

    HardwareInfo {
        cpu_brand,
        cpu_cores: sys.cpus().len(),
        total_memory_mb: sys.total_memory() / 1024 / 1024,
        os: format!(
            "{} {}",
            System::name().unwrap_or_else(|| "Unknown".to_string()),
            System::os_version().unwrap_or_else(|| "Unknown".to_string())
        ),
    }
}

// ============================================================================
// Utilities
// ============================================================================

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max - 1).collect();
        out.push('…');
        out
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();

    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{}m {:.0}s", duration.as_secs() / 60, secs % 60.0)
    }
}
