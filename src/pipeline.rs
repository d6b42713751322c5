//! Sequential corpus × algorithm driver and report output.

use crate::algorithm::Algorithm;
use crate::config::BenchConfig;
use crate::corpus::Corpus;
use crate::error::{BenchError, Result};
use crate::metrics::{Aggregator, BenchmarkRun, RunFailure};
use crate::report::{self, ReportMeta};
use crate::runner::{Invoker, ProcessInvoker, Runner};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Notification sent after each triple completes.
#[derive(Debug)]
pub struct Progress<'a> {
    /// 1-based position in the matrix
    pub index: usize,
    /// Total triples
    pub total: usize,
    /// Measurement or failure of this triple
    pub result: std::result::Result<&'a BenchmarkRun, &'a RunFailure>,
}

/// Runs every (file, algorithm) triple, one at a time.
#[derive(Debug)]
pub struct Pipeline<I: Invoker = ProcessInvoker> {
    runner: Runner<I>,
    algorithms: Vec<Algorithm>,
    repeats: usize,
}

impl Pipeline<ProcessInvoker> {
    /// Pipeline spawning the configured binaries.
    pub fn from_config(config: &BenchConfig) -> Self {
        let runner = Runner::new(&config.work_dir).keep_artifacts(config.keep_artifacts);
        Self::new(runner, config.algorithms.clone()).with_repeats(config.repeats)
    }
}

impl<I: Invoker> Pipeline<I> {
    /// Pipeline over an explicit runner and algorithm list.
    pub fn new(runner: Runner<I>, algorithms: Vec<Algorithm>) -> Self {
        Self {
            runner,
            algorithms,
            repeats: 1,
        }
    }

    /// Measures every triple `repeats` times (at least once).
    ///
    /// Each repetition is recorded as its own run; repeated runs whose
    /// compressed sizes disagree are reported after the batch.
    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats.max(1);
        self
    }

    /// Configured algorithms, in execution order.
    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    /// Processes the corpus in file order, then algorithm order.
    ///
    /// Failed triples are recorded and skipped; nothing aborts the batch.
    pub fn run(&self, corpus: &Corpus, mut progress: impl FnMut(Progress<'_>)) -> Aggregator {
        let total = corpus.len() * self.algorithms.len() * self.repeats;
        let mut aggregator = Aggregator::new();
        let mut index = 0;

        info!(
            files = corpus.len(),
            algorithms = self.algorithms.len(),
            repeats = self.repeats,
            total,
            "starting benchmark"
        );

        for file in corpus.files() {
            for algorithm in &self.algorithms {
                for _ in 0..self.repeats {
                    index += 1;
                    match self.runner.run(&file.path, algorithm) {
                        Ok(run) => {
                            progress(Progress {
                                index,
                                total,
                                result: Ok(&run),
                            });
                            aggregator.add_run(run);
                        }
                        Err(failure) => {
                            warn!(
                                file = %failure.file,
                                algorithm = %failure.algorithm,
                                phase = %failure.phase,
                                reason = %failure.reason,
                                "run failed"
                            );
                            progress(Progress {
                                index,
                                total,
                                result: Err(&failure),
                            });
                            aggregator.add_failure(failure);
                        }
                    }
                }
            }
        }

        for (file, algorithm) in aggregator.nondeterministic() {
            warn!(%file, %algorithm, "compressed size differs between repeated runs");
        }

        aggregator
    }
}

/// Paths of the written reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// CSV dataset
    pub csv: PathBuf,
    /// HTML dashboard
    pub html: PathBuf,
    /// JSON export, when requested
    pub json: Option<PathBuf>,
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| BenchError::io(path, e))
}

/// Renders the aggregator's log and writes CSV, HTML and optionally JSON.
pub fn write_reports(
    config: &BenchConfig,
    meta: &ReportMeta,
    aggregator: &Aggregator,
) -> Result<ReportPaths> {
    let summaries = aggregator.summarize();
    let totals = aggregator.totals();
    let rendered = report::render_with(meta, aggregator.runs(), &summaries, &totals)?;

    fs::create_dir_all(&config.output_dir).map_err(|e| BenchError::io(&config.output_dir, e))?;

    let paths = ReportPaths {
        csv: config.csv_path(),
        html: config.html_path(),
        json: config.json.then(|| config.json_path()),
    };

    write_file(&paths.csv, &rendered.csv)?;
    write_file(&paths.html, &rendered.html)?;
    if let Some(json_path) = &paths.json {
        let json = report::render_json(
            meta,
            aggregator.runs(),
            aggregator.failures(),
            &summaries,
            &totals,
        )?;
        write_file(json_path, &json)?;
    }

    info!(csv = %paths.csv.display(), html = %paths.html.display(), "reports written");
    Ok(paths)
}
