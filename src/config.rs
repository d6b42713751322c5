//! Benchmark configuration: paths, algorithm matrix, environment filters.

use crate::algorithm::{self, Algorithm};
use crate::error::{BenchError, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// File name of the CSV dataset inside the output directory.
pub const CSV_FILE: &str = "compression_results.csv";
/// File name of the HTML dashboard inside the output directory.
pub const HTML_FILE: &str = "compression_report.html";
/// File name of the JSON export inside the output directory.
pub const JSON_FILE: &str = "compression_report.json";

/// Comma-separated codec families or labels, e.g. `gzip,zstd-19`.
pub const ENV_ALGOS: &str = "BENCH_ALGOS";
/// Comma-separated levels applied to family selectors, e.g. `1,9`.
pub const ENV_LEVELS: &str = "BENCH_LEVELS";

/// Everything one benchmark execution needs.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Directory holding the extracted corpus
    pub corpus_dir: PathBuf,
    /// Directory for compressed and round-tripped artifacts
    pub work_dir: PathBuf,
    /// Directory receiving the reports
    pub output_dir: PathBuf,
    /// Configurations to run, in order
    pub algorithms: Vec<Algorithm>,
    /// Leave artifacts in `work_dir` after each run
    pub keep_artifacts: bool,
    /// Also write the JSON export
    pub json: bool,
    /// Measurements per (file, algorithm) pair
    pub repeats: usize,
}

impl BenchConfig {
    /// Reference matrix with default directories under `corpus_dir`'s parent.
    pub fn new(corpus_dir: impl Into<PathBuf>) -> Self {
        let corpus_dir = corpus_dir.into();
        let base = corpus_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            work_dir: base.join("squeezebench-work"),
            output_dir: base.join("squeezebench-results"),
            corpus_dir,
            algorithms: algorithm::reference_matrix(),
            keep_artifacts: false,
            json: false,
            repeats: 1,
        }
    }

    /// Narrows the matrix with `BENCH_ALGOS` / `BENCH_LEVELS` when set.
    pub fn from_env(corpus_dir: impl Into<PathBuf>) -> Result<Self> {
        let algos = std::env::var(ENV_ALGOS).ok();
        let levels = std::env::var(ENV_LEVELS).ok();
        Self::new(corpus_dir).with_filters(algos.as_deref(), levels.as_deref())
    }

    /// Applies comma-separated algorithm and level filters.
    ///
    /// Levels alone restrict every reference family to those levels.
    pub fn with_filters(mut self, algos: Option<&str>, levels: Option<&str>) -> Result<Self> {
        let levels = levels.map(parse_levels).transpose()?;
        let selectors: Vec<String> = match algos {
            Some(list) => split_list(list),
            None if levels.is_some() => {
                algorithm::Codec::ALL.iter().map(|c| c.name().to_string()).collect()
            }
            None => return Ok(self),
        };

        let selected = algorithm::select(&selectors, levels.as_deref())?;
        if selected.is_empty() {
            return Err(BenchError::UnknownAlgorithm(
                algos.unwrap_or_default().to_string(),
            ));
        }
        self.algorithms = selected;
        Ok(self)
    }

    /// CSV report path.
    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(CSV_FILE)
    }

    /// HTML report path.
    pub fn html_path(&self) -> PathBuf {
        self.output_dir.join(HTML_FILE)
    }

    /// JSON export path.
    pub fn json_path(&self) -> PathBuf {
        self.output_dir.join(JSON_FILE)
    }

    /// Distinct programs the configured matrix spawns.
    pub fn programs(&self) -> BTreeSet<&str> {
        self.algorithms.iter().flat_map(|a| a.programs()).collect()
    }

    /// Fails on the first program that cannot be spawned.
    pub fn check_binaries(&self) -> Result<()> {
        for program in self.programs() {
            if !is_available(program) {
                return Err(BenchError::MissingBinary(program.to_string()));
            }
        }
        Ok(())
    }

    /// Creates the work and output directories.
    ///
    /// Neither may be the corpus directory: artifacts and reports written
    /// there could replace corpus files.
    pub fn prepare_dirs(&self) -> Result<()> {
        for (what, dir) in [("work", &self.work_dir), ("output", &self.output_dir)] {
            if same_dir(dir, &self.corpus_dir) {
                return Err(BenchError::Config(format!(
                    "{} directory {} is the corpus directory",
                    what,
                    dir.display()
                )));
            }
        }
        for dir in [&self.work_dir, &self.output_dir] {
            std::fs::create_dir_all(dir).map_err(|e| BenchError::io(dir, e))?;
        }
        Ok(())
    }
}

/// True if `program --version` can be spawned. The exit status is ignored.
pub fn is_available(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_levels(list: &str) -> Result<Vec<u32>> {
    split_list(list)
        .iter()
        .map(|s| {
            s.parse()
                .map_err(|_| BenchError::UnknownAlgorithm(format!("level {}", s)))
        })
        .collect()
}
