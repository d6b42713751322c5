//! # squeezebench
//!
//! A benchmark harness for the gzip, bzip2, xz and zstd command-line tools.
//!
//! Every file of a reference corpus is compressed and decompressed with each
//! configured (codec, level) pair. Each run is timed, checked for a
//! byte-identical round trip, and recorded. The run log is then folded into
//! per-algorithm summaries and written out as a CSV dataset and an HTML
//! dashboard.
//!
//! ## Quick Start
//!
//! ```no_run
//! use squeezebench::{BenchConfig, Corpus, Pipeline, write_reports, ReportMeta};
//!
//! let config = BenchConfig::new("silesia");
//! config.check_binaries()?;
//! config.prepare_dirs()?;
//!
//! let corpus = Corpus::open(&config.corpus_dir)?;
//! let aggregator = Pipeline::from_config(&config).run(&corpus, |_| {});
//!
//! for summary in aggregator.summarize() {
//!     println!("{}: {:?}", summary.algorithm, summary.avg_ratio);
//! }
//! write_reports(&config, &ReportMeta::default(), &aggregator)?;
//! # Ok::<(), squeezebench::BenchError>(())
//! ```
//!
//! ## Measurements
//!
//! - Ratio is original size over compressed size.
//! - Throughput is original size in MB (1,048,576 bytes) over wall-clock
//!   seconds, for compression and decompression separately.
//! - Averages skip undefined values; the overall ratio of an algorithm is
//!   total original bytes over total compressed bytes.
//!
//! Runs whose round trip does not match are flagged `verified = false` but
//! still count in every summary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithm;
pub mod config;
pub mod corpus;
mod dashboard;
mod error;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod verify;

pub use algorithm::{Algorithm, Codec, CommandTemplate, reference_matrix};
pub use config::BenchConfig;
pub use corpus::{Corpus, CorpusFile};
pub use dashboard::{CHART_JS_URL, escape_html};
pub use error::{BenchError, Result};
pub use metrics::{Aggregator, AlgorithmSummary, BenchmarkRun, Phase, RunFailure};
pub use pipeline::{Pipeline, Progress, ReportPaths, write_reports};
pub use report::{HardwareInfo, Rendered, ReportMeta, render, render_with};
pub use runner::{Invocation, Invoker, ProcessInvoker, Runner};
