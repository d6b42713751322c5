//! CSV and JSON serialization of the run log and its summaries.
//!
//! The CSV stream holds three tables separated by blank lines:
//!
//! 1. one row per successful run,
//! 2. per-algorithm averages (algorithm cells prefixed with `Avg `),
//! 3. per-algorithm totals with the overall ratio.
//!
//! Each table starts with its own header row. Undefined values are written as
//! `N/A`.

use crate::dashboard;
use crate::error::{BenchError, Result};
use crate::metrics::{AlgorithmSummary, BenchmarkRun, BYTES_PER_KB, RunFailure};
use serde::Serialize;

/// Placeholder for undefined ratios and throughputs.
pub const NOT_AVAILABLE: &str = "N/A";

/// Prefix of algorithm cells in the averages table.
pub const AVG_PREFIX: &str = "Avg ";

const RUN_HEADER: [&str; 10] = [
    "File",
    "Algorithm",
    "Original Size (KB)",
    "Compressed Size (KB)",
    "Compression Ratio",
    "Compression Time (s)",
    "Decompression Time (s)",
    "Compression Speed (MB/s)",
    "Decompression Speed (MB/s)",
    "Verified",
];

const AVERAGE_HEADER: [&str; 7] = [
    "Algorithm",
    "Runs",
    "Avg Ratio",
    "Avg Compression Time (s)",
    "Avg Decompression Time (s)",
    "Avg Compression Speed (MB/s)",
    "Avg Decompression Speed (MB/s)",
];

const TOTAL_HEADER: [&str; 4] = [
    "Algorithm",
    "Total Original (KB)",
    "Total Compressed (KB)",
    "Overall Ratio",
];

/// Host the benchmark ran on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HardwareInfo {
    /// CPU model string
    pub cpu_brand: String,
    /// Logical cores
    pub cpu_cores: usize,
    /// Installed memory
    pub total_memory_mb: u64,
    /// OS name and version
    pub os: String,
}

/// Context shown in report headers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportMeta {
    /// Generation timestamp, preformatted
    pub generated_at: String,
    /// Corpus location
    pub corpus: String,
    /// Host description, if collected
    pub hardware: Option<HardwareInfo>,
    /// Triples that produced no measurement
    pub failed_runs: usize,
}

/// The two report documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Three-table CSV stream
    pub csv: String,
    /// Self-contained HTML dashboard
    pub html: String,
}

/// Renders CSV and HTML without header metadata.
pub fn render(
    runs: &[BenchmarkRun],
    summaries: &[AlgorithmSummary],
    totals: &[AlgorithmSummary],
) -> Result<Rendered> {
    render_with(&ReportMeta::default(), runs, summaries, totals)
}

/// Renders CSV and HTML with header metadata.
pub fn render_with(
    meta: &ReportMeta,
    runs: &[BenchmarkRun],
    summaries: &[AlgorithmSummary],
    totals: &[AlgorithmSummary],
) -> Result<Rendered> {
    Ok(Rendered {
        csv: render_csv(runs, summaries, totals)?,
        html: dashboard::render_html(meta, runs, summaries, totals),
    })
}

/// Formats `value` with `decimals` places, or `N/A`.
pub fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub(crate) fn kb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_KB
}

/// Builds the three-table CSV stream.
pub fn render_csv(
    runs: &[BenchmarkRun],
    summaries: &[AlgorithmSummary],
    totals: &[AlgorithmSummary],
) -> Result<String> {
    let runs_table = table(&RUN_HEADER, runs.iter().map(run_record))?;
    let average_table = table(&AVERAGE_HEADER, summaries.iter().map(average_record))?;
    let total_table = table(&TOTAL_HEADER, totals.iter().map(total_record))?;

    Ok([runs_table, average_table, total_table].join("\n"))
}

fn table<const N: usize>(
    header: &[&str; N],
    rows: impl Iterator<Item = [String; N]>,
) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(&row)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| BenchError::Report(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn run_record(run: &BenchmarkRun) -> [String; 10] {
    [
        run.file.clone(),
        run.algorithm.clone(),
        format!("{:.2}", run.original_kb),
        format!("{:.2}", run.compressed_kb),
        fmt_opt(run.ratio, 2),
        format!("{:.4}", run.compress_secs),
        format!("{:.4}", run.decompress_secs),
        fmt_opt(run.compress_mbps, 2),
        fmt_opt(run.decompress_mbps, 2),
        run.verified.to_string(),
    ]
}

fn average_record(s: &AlgorithmSummary) -> [String; 7] {
    [
        format!("{}{}", AVG_PREFIX, s.algorithm),
        s.runs.to_string(),
        fmt_opt(s.avg_ratio, 2),
        format!("{:.4}", s.avg_compress_secs),
        format!("{:.4}", s.avg_decompress_secs),
        fmt_opt(s.avg_compress_mbps, 2),
        fmt_opt(s.avg_decompress_mbps, 2),
    ]
}

fn total_record(s: &AlgorithmSummary) -> [String; 4] {
    [
        s.algorithm.clone(),
        format!("{:.2}", kb(s.total_original_bytes)),
        format!("{:.2}", kb(s.total_compressed_bytes)),
        fmt_opt(s.overall_ratio, 2),
    ]
}

#[derive(Serialize)]
struct JsonReport<'a> {
    meta: &'a ReportMeta,
    runs: &'a [BenchmarkRun],
    failures: &'a [RunFailure],
    summaries: &'a [AlgorithmSummary],
    totals: &'a [AlgorithmSummary],
}

/// Pretty-printed JSON export of everything measured.
pub fn render_json(
    meta: &ReportMeta,
    runs: &[BenchmarkRun],
    failures: &[RunFailure],
    summaries: &[AlgorithmSummary],
    totals: &[AlgorithmSummary],
) -> Result<String> {
    let report = JsonReport {
        meta,
        runs,
        failures,
        summaries,
        totals,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Aggregator, Phase};
    use std::time::Duration;

    fn sample() -> Aggregator {
        let mut agg = Aggregator::new();
        agg.add_run(BenchmarkRun::new(
            "dickens",
            "gzip-6",
            1_048_576,
            524_288,
            Duration::from_secs(1),
            Duration::from_millis(500),
            true,
        ));
        agg.add_run(BenchmarkRun::new(
            "xml, v2",
            "gzip-6",
            2048,
            512,
            Duration::ZERO,
            Duration::from_millis(1),
            false,
        ));
        agg.add_run(BenchmarkRun::new(
            "dickens",
            "xz-9",
            1_048_576,
            262_144,
            Duration::from_secs(4),
            Duration::from_millis(250),
            true,
        ));
        agg
    }

    #[test]
    fn test_csv_three_tables() {
        let agg = sample();
        let csv = render_csv(agg.runs(), &agg.summarize(), &agg.totals()).unwrap();
        let sections: Vec<&str> = csv.split("\n\n").collect();
        assert_eq!(sections.len(), 3);

        let runs: Vec<&str> = sections[0].lines().collect();
        assert_eq!(runs.len(), 4);
        assert!(runs[0].starts_with("File,Algorithm,Original Size (KB)"));
        assert_eq!(
            runs[1],
            "dickens,gzip-6,1024.00,512.00,2.00,1.0000,0.5000,1.00,2.00,true"
        );
        // quoted name, undefined compression speed
        assert_eq!(
            runs[2],
            "\"xml, v2\",gzip-6,2.00,0.50,4.00,0.0000,0.0010,N/A,1.95,false"
        );

        let avgs: Vec<&str> = sections[1].lines().collect();
        assert!(avgs[0].starts_with("Algorithm,Runs,Avg Ratio"));
        assert!(avgs[1].starts_with("Avg xz-9,1,4.00,"));
        assert!(avgs[2].starts_with("Avg gzip-6,2,3.00,0.5000,0.2505,1.00,"));

        let totals: Vec<&str> = sections[2].lines().collect();
        assert_eq!(totals[0], "Algorithm,Total Original (KB),Total Compressed (KB),Overall Ratio");
        assert_eq!(totals[1], "xz-9,1024.00,256.00,4.00");
        assert_eq!(totals[2], "gzip-6,1026.00,512.50,2.00");
    }

    #[test]
    fn test_csv_empty_log_keeps_headers() {
        let csv = render_csv(&[], &[], &[]).unwrap();
        assert_eq!(csv.split("\n\n").count(), 3);
        assert!(csv.contains("Overall Ratio"));
    }

    #[test]
    fn test_fmt_opt() {
        assert_eq!(fmt_opt(Some(2.0), 2), "2.00");
        assert_eq!(fmt_opt(Some(1.23456), 4), "1.2346");
        assert_eq!(fmt_opt(None, 2), "N/A");
    }

    #[test]
    fn test_render_both_documents() {
        let agg = sample();
        let rendered = render(agg.runs(), &agg.summarize(), &agg.totals()).unwrap();
        assert!(rendered.csv.starts_with("File,"));
        assert!(rendered.html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_json_export() {
        let mut agg = sample();
        agg.add_failure(RunFailure {
            file: "nci".into(),
            algorithm: "bzip2-9".into(),
            phase: Phase::Decompress,
            reason: "exit status 2".into(),
        });
        let meta = ReportMeta {
            generated_at: "2026-01-01 00:00:00 UTC".into(),
            corpus: "/data/silesia".into(),
            hardware: None,
            failed_runs: 1,
        };

        let json = render_json(&meta, agg.runs(), agg.failures(), &agg.summarize(), &agg.totals())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["runs"].as_array().unwrap().len(), 3);
        assert_eq!(value["runs"][1]["compress_mbps"], serde_json::Value::Null);
        assert_eq!(value["failures"][0]["phase"], "decompress");
        assert_eq!(value["totals"][0]["algorithm"], "xz-9");
        assert_eq!(value["meta"]["failed_runs"], 1);
    }
}
