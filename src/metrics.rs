//! Per-run records and per-algorithm aggregation.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Bytes per KB in reports.
pub const BYTES_PER_KB: f64 = 1024.0;
/// Bytes per MB in throughput figures.
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One (file, algorithm, level) execution that produced a compressed artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRun {
    /// Corpus file name
    pub file: String,
    /// Algorithm label, e.g. `gzip-6`
    pub algorithm: String,
    /// Size of the input
    pub original_bytes: u64,
    /// Size of the input in KB
    pub original_kb: f64,
    /// Size of the compressed artifact
    pub compressed_bytes: u64,
    /// Size of the compressed artifact in KB
    pub compressed_kb: f64,
    /// original / compressed, `None` when compressed is empty
    pub ratio: Option<f64>,
    /// Wall-clock compression time
    pub compress_secs: f64,
    /// Wall-clock decompression time
    pub decompress_secs: f64,
    /// MB/s while compressing, `None` for a zero duration
    pub compress_mbps: Option<f64>,
    /// MB/s while decompressing, `None` for a zero duration
    pub decompress_mbps: Option<f64>,
    /// Round-trip digest matched the input
    pub verified: bool,
}

impl BenchmarkRun {
    /// Builds a run and derives ratio and throughput from the raw measurements.
    pub fn new(
        file: impl Into<String>,
        algorithm: impl Into<String>,
        original_bytes: u64,
        compressed_bytes: u64,
        compress_time: Duration,
        decompress_time: Duration,
        verified: bool,
    ) -> Self {
        let compress_secs = compress_time.as_secs_f64();
        let decompress_secs = decompress_time.as_secs_f64();

        Self {
            file: file.into(),
            algorithm: algorithm.into(),
            original_bytes,
            original_kb: original_bytes as f64 / BYTES_PER_KB,
            compressed_bytes,
            compressed_kb: compressed_bytes as f64 / BYTES_PER_KB,
            ratio: ratio(original_bytes, compressed_bytes),
            compress_secs,
            decompress_secs,
            compress_mbps: throughput(original_bytes, compress_secs),
            decompress_mbps: throughput(original_bytes, decompress_secs),
            verified,
        }
    }
}

/// original / compressed, undefined for an empty artifact.
pub fn ratio(original_bytes: u64, compressed_bytes: u64) -> Option<f64> {
    if compressed_bytes == 0 {
        None
    } else {
        Some(original_bytes as f64 / compressed_bytes as f64)
    }
}

/// MB of input processed per second, undefined for a zero duration.
pub fn throughput(original_bytes: u64, secs: f64) -> Option<f64> {
    if secs > 0.0 {
        Some(original_bytes as f64 / BYTES_PER_MB / secs)
    } else {
        None
    }
}

/// Stage of a run that failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Input checks or the compressor itself
    Compress,
    /// The decompressor
    Decompress,
    /// Digesting the round-tripped file
    Verify,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Compress => "compress",
            Phase::Decompress => "decompress",
            Phase::Verify => "verify",
        })
    }
}

/// A triple that produced no usable measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunFailure {
    /// Corpus file name
    pub file: String,
    /// Algorithm label
    pub algorithm: String,
    /// Where it went wrong
    pub phase: Phase,
    /// Human-readable cause
    pub reason: String,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} failed for {}: {}",
            self.algorithm, self.phase, self.file, self.reason
        )
    }
}

/// Aggregate over every successful run sharing one label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmSummary {
    /// Algorithm label
    pub algorithm: String,
    /// Successful runs in the group
    pub runs: usize,
    /// Mean of per-run ratios
    pub avg_ratio: Option<f64>,
    /// Mean compression time
    pub avg_compress_secs: f64,
    /// Mean decompression time
    pub avg_decompress_secs: f64,
    /// Mean compression throughput
    pub avg_compress_mbps: Option<f64>,
    /// Mean decompression throughput
    pub avg_decompress_mbps: Option<f64>,
    /// Sum of input sizes
    pub total_original_bytes: u64,
    /// Sum of compressed sizes
    pub total_compressed_bytes: u64,
    /// Sum of input sizes / sum of compressed sizes
    pub overall_ratio: Option<f64>,
}

impl AlgorithmSummary {
    fn from_group(algorithm: &str, runs: &[&BenchmarkRun]) -> Self {
        let count = runs.len();
        let total_original_bytes = runs.iter().map(|r| r.original_bytes).sum();
        let total_compressed_bytes = runs.iter().map(|r| r.compressed_bytes).sum();

        Self {
            algorithm: algorithm.to_string(),
            runs: count,
            avg_ratio: mean(runs.iter().map(|r| r.ratio)),
            avg_compress_secs: runs.iter().map(|r| r.compress_secs).sum::<f64>() / count as f64,
            avg_decompress_secs: runs.iter().map(|r| r.decompress_secs).sum::<f64>()
                / count as f64,
            avg_compress_mbps: mean(runs.iter().map(|r| r.compress_mbps)),
            avg_decompress_mbps: mean(runs.iter().map(|r| r.decompress_mbps)),
            total_original_bytes,
            total_compressed_bytes,
            overall_ratio: ratio(total_original_bytes, total_compressed_bytes),
        }
    }
}

/// Mean of the defined values; `None` if there are none.
fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, n) = values
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Descending by value, undefined last, then ascending by label.
fn rank(a: Option<f64>, b: Option<f64>, a_label: &str, b_label: &str) -> Ordering {
    let by_value = match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_value.then_with(|| a_label.cmp(b_label))
}

/// Append-only run log for one benchmark execution.
#[derive(Debug, Default)]
pub struct Aggregator {
    runs: Vec<BenchmarkRun>,
    failures: Vec<RunFailure>,
}

impl Aggregator {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful run.
    pub fn add_run(&mut self, run: BenchmarkRun) {
        self.runs.push(run);
    }

    /// Records a failed triple. Failures never enter any average.
    pub fn add_failure(&mut self, failure: RunFailure) {
        self.failures.push(failure);
    }

    /// Successful runs in insertion order.
    pub fn runs(&self) -> &[BenchmarkRun] {
        &self.runs
    }

    /// Failed triples in insertion order.
    pub fn failures(&self) -> &[RunFailure] {
        &self.failures
    }

    /// Runs whose round trip did not reproduce the input.
    pub fn unverified(&self) -> impl Iterator<Item = &BenchmarkRun> {
        self.runs.iter().filter(|r| !r.verified)
    }

    fn groups(&self) -> BTreeMap<&str, Vec<&BenchmarkRun>> {
        let mut groups: BTreeMap<&str, Vec<&BenchmarkRun>> = BTreeMap::new();
        for run in &self.runs {
            groups.entry(run.algorithm.as_str()).or_default().push(run);
        }
        groups
    }

    fn summaries(&self) -> Vec<AlgorithmSummary> {
        self.groups()
            .into_iter()
            .map(|(label, runs)| AlgorithmSummary::from_group(label, &runs))
            .collect()
    }

    /// Per-label averages, best mean ratio first.
    pub fn summarize(&self) -> Vec<AlgorithmSummary> {
        let mut summaries = self.summaries();
        summaries.sort_by(|a, b| rank(a.avg_ratio, b.avg_ratio, &a.algorithm, &b.algorithm));
        summaries
    }

    /// Per-label totals, best overall ratio first.
    pub fn totals(&self) -> Vec<AlgorithmSummary> {
        let mut summaries = self.summaries();
        summaries.sort_by(|a, b| {
            rank(a.overall_ratio, b.overall_ratio, &a.algorithm, &b.algorithm)
        });
        summaries
    }

    /// (file, label) pairs measured more than once with differing compressed sizes.
    pub fn nondeterministic(&self) -> Vec<(String, String)> {
        let mut sizes: BTreeMap<(&str, &str), Vec<u64>> = BTreeMap::new();
        for run in &self.runs {
            sizes
                .entry((run.file.as_str(), run.algorithm.as_str()))
                .or_default()
                .push(run.compressed_bytes);
        }

        sizes
            .into_iter()
            .filter(|(_, s)| s.windows(2).any(|w| w[0] != w[1]))
            .map(|((file, algo), _)| (file.to_string(), algo.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(file: &str, algo: &str, original: u64, compressed: u64) -> BenchmarkRun {
        BenchmarkRun::new(
            file,
            algo,
            original,
            compressed,
            Duration::from_millis(100),
            Duration::from_millis(50),
            true,
        )
    }

    #[test]
    fn test_derived_metrics() {
        let r = BenchmarkRun::new(
            "dickens",
            "gzip-6",
            1_048_576,
            524_288,
            Duration::from_secs(1),
            Duration::from_millis(500),
            true,
        );
        assert_eq!(r.original_kb, 1024.0);
        assert_eq!(r.compressed_kb, 512.0);
        assert_eq!(r.ratio, Some(2.0));
        assert_eq!(r.compress_mbps, Some(1.0));
        assert_eq!(r.decompress_mbps, Some(2.0));
    }

    #[test]
    fn test_undefined_values() {
        let r = BenchmarkRun::new("a", "xz-9", 100, 0, Duration::ZERO, Duration::ZERO, false);
        assert_eq!(r.ratio, None);
        assert_eq!(r.compress_mbps, None);
        assert_eq!(r.decompress_mbps, None);
    }

    #[test]
    fn test_levels_are_distinct_groups() {
        let mut agg = Aggregator::new();
        agg.add_run(run("a", "gzip-1", 1000, 500));
        agg.add_run(run("a", "gzip-9", 1000, 400));
        agg.add_run(run("b", "gzip-1", 1000, 250));

        let summaries = agg.summarize();
        assert_eq!(summaries.len(), 2);

        let g1 = summaries.iter().find(|s| s.algorithm == "gzip-1").unwrap();
        let g9 = summaries.iter().find(|s| s.algorithm == "gzip-9").unwrap();
        assert_eq!(g1.runs, 2);
        assert_eq!(g9.runs, 1);
        assert_eq!(g1.avg_ratio, Some(3.0));
        assert_eq!(g9.avg_ratio, Some(2.5));
    }

    #[test]
    fn test_overall_ratio_differs_from_mean_ratio() {
        let mut agg = Aggregator::new();
        // 10:1 on a small file, 2:1 on a large one
        agg.add_run(run("small", "zstd-19", 1_000, 100));
        agg.add_run(run("large", "zstd-19", 100_000, 50_000));

        let totals = agg.totals();
        let t = &totals[0];
        assert_eq!(t.total_original_bytes, 101_000);
        assert_eq!(t.total_compressed_bytes, 50_100);

        let overall = t.overall_ratio.unwrap();
        assert!((overall - 101_000.0 / 50_100.0).abs() < 1e-12);
        assert!((t.avg_ratio.unwrap() - 6.0).abs() < 1e-12);
        assert!((overall - t.avg_ratio.unwrap()).abs() > 1.0);
    }

    #[test]
    fn test_orderings() {
        let mut agg = Aggregator::new();
        // xz: mean ratio high, overall ratio low
        agg.add_run(run("small", "xz-9", 1_000, 100));
        agg.add_run(run("large", "xz-9", 100_000, 50_000));
        // bzip2: uniform 3:1
        agg.add_run(run("small", "bzip2-9", 1_000, 333));
        agg.add_run(run("large", "bzip2-9", 99_999, 33_333));

        let by_avg: Vec<String> = agg.summarize().into_iter().map(|s| s.algorithm).collect();
        assert_eq!(by_avg, ["xz-9", "bzip2-9"]);

        let by_total: Vec<String> = agg.totals().into_iter().map(|s| s.algorithm).collect();
        assert_eq!(by_total, ["bzip2-9", "xz-9"]);
    }

    #[test]
    fn test_order_independent_of_insertion() {
        let runs = vec![
            run("a", "gzip-6", 1000, 500),
            run("a", "zstd-1", 1000, 500),
            run("a", "xz-6", 1000, 200),
        ];

        let mut forward = Aggregator::new();
        runs.iter().cloned().for_each(|r| forward.add_run(r));
        let mut backward = Aggregator::new();
        runs.iter().rev().cloned().for_each(|r| backward.add_run(r));

        assert_eq!(forward.summarize(), backward.summarize());
        assert_eq!(forward.totals(), backward.totals());
        let labels: Vec<String> = forward.summarize().into_iter().map(|s| s.algorithm).collect();
        assert_eq!(labels, ["xz-6", "gzip-6", "zstd-1"]);
    }

    #[test]
    fn test_mean_skips_undefined() {
        let mut agg = Aggregator::new();
        agg.add_run(BenchmarkRun::new(
            "a",
            "gzip-1",
            2_097_152,
            1_000,
            Duration::from_secs(1),
            Duration::ZERO,
            true,
        ));
        agg.add_run(BenchmarkRun::new(
            "b",
            "gzip-1",
            2_097_152,
            1_000,
            Duration::ZERO,
            Duration::ZERO,
            true,
        ));

        let s = &agg.summarize()[0];
        assert_eq!(s.avg_compress_mbps, Some(2.0));
        assert_eq!(s.avg_decompress_mbps, None);
        assert_eq!(s.avg_compress_secs, 0.5);
    }

    #[test]
    fn test_failures_are_not_aggregated() {
        let mut agg = Aggregator::new();
        agg.add_failure(RunFailure {
            file: "a".into(),
            algorithm: "bzip2-1".into(),
            phase: Phase::Compress,
            reason: "exit status 1".into(),
        });
        agg.add_run(run("b", "gzip-1", 1000, 500));

        assert!(agg.summarize().iter().all(|s| s.algorithm != "bzip2-1"));
        assert!(agg.totals().iter().all(|s| s.algorithm != "bzip2-1"));
        assert_eq!(agg.failures().len(), 1);
    }

    #[test]
    fn test_unverified_runs_still_count() {
        let mut agg = Aggregator::new();
        let mut bad = run("a", "gzip-9", 1000, 100);
        bad.verified = false;
        agg.add_run(bad);
        agg.add_run(run("b", "gzip-9", 1000, 500));

        assert_eq!(agg.unverified().count(), 1);
        assert_eq!(agg.summarize()[0].runs, 2);
    }

    #[test]
    fn test_nondeterministic_sizes_flagged() {
        let mut agg = Aggregator::new();
        agg.add_run(run("a", "zstd-19", 1000, 300));
        agg.add_run(run("a", "zstd-19", 1000, 300));
        agg.add_run(run("b", "zstd-19", 1000, 300));
        agg.add_run(run("b", "zstd-19", 1000, 301));

        assert_eq!(
            agg.nondeterministic(),
            vec![("b".to_string(), "zstd-19".to_string())]
        );
    }

    #[test]
    fn test_empty_log() {
        let agg = Aggregator::new();
        assert!(agg.summarize().is_empty());
        assert!(agg.totals().is_empty());
    }
}
