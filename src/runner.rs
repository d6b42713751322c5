//! Executes one (file, algorithm) triple: compress, decompress, verify.

use crate::algorithm::{Algorithm, CommandTemplate};
use crate::metrics::{BenchmarkRun, Phase, RunFailure};
use crate::verify;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Outcome of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Wall-clock time from spawn to exit
    pub elapsed: Duration,
    /// Exit code, `None` if killed by a signal
    pub code: Option<i32>,
    /// Process exited successfully
    pub success: bool,
    /// Captured diagnostics
    pub stderr: String,
}

impl Invocation {
    /// A successful invocation that took `elapsed`.
    pub fn ok(elapsed: Duration) -> Self {
        Self {
            elapsed,
            code: Some(0),
            success: true,
            stderr: String::new(),
        }
    }

    /// A failed invocation with exit code `code`.
    pub fn failed(elapsed: Duration, code: i32, stderr: impl Into<String>) -> Self {
        Self {
            elapsed,
            code: Some(code),
            success: false,
            stderr: stderr.into(),
        }
    }
}

/// Runs a command template against `input`, writing its stdout to `output`.
///
/// Implementations own the timing: the measured span covers the external work
/// and nothing else.
pub trait Invoker {
    /// Executes `command` and reports how long it ran.
    fn invoke(&self, command: &CommandTemplate, input: &Path, output: &Path)
    -> io::Result<Invocation>;
}

/// Spawns real subprocesses.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessInvoker;

impl Invoker for ProcessInvoker {
    fn invoke(
        &self,
        command: &CommandTemplate,
        input: &Path,
        output: &Path,
    ) -> io::Result<Invocation> {
        let sink = File::create(output)?;
        let mut cmd = Command::new(&command.program);
        cmd.args(command.render(input))
            .stdin(Stdio::null())
            .stdout(Stdio::from(sink))
            .stderr(Stdio::piped());

        let start = Instant::now();
        let child = cmd.spawn()?;
        let result = child.wait_with_output()?;
        let elapsed = start.elapsed();

        Ok(Invocation {
            elapsed,
            code: result.status.code(),
            success: result.status.success(),
            stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        })
    }
}

/// Drives one triple at a time inside a working directory.
#[derive(Debug)]
pub struct Runner<I: Invoker = ProcessInvoker> {
    work_dir: PathBuf,
    invoker: I,
    keep_artifacts: bool,
}

impl Runner<ProcessInvoker> {
    /// Runner spawning real processes, artifacts under `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self::with_invoker(work_dir, ProcessInvoker)
    }
}

impl<I: Invoker> Runner<I> {
    /// Runner using a custom invoker.
    pub fn with_invoker(work_dir: impl Into<PathBuf>, invoker: I) -> Self {
        Self {
            work_dir: work_dir.into(),
            invoker,
            keep_artifacts: false,
        }
    }

    /// Leave compressed and round-tripped artifacts on disk.
    pub fn keep_artifacts(mut self, keep: bool) -> Self {
        self.keep_artifacts = keep;
        self
    }

    /// Working directory for artifacts.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Compressed and round-trip paths for `file_name` under `algorithm`.
    ///
    /// Distinct (file, label) pairs never share a path.
    pub fn artifact_paths(&self, file_name: &str, algorithm: &Algorithm) -> (PathBuf, PathBuf) {
        let stem = format!("{}.{}", file_name, algorithm.label);
        (
            self.work_dir.join(format!("{}.{}", stem, algorithm.extension)),
            self.work_dir.join(format!("{}.out", stem)),
        )
    }

    /// Compresses and decompresses `file` with `algorithm` and measures both phases.
    ///
    /// Any problem with the external tools yields a [`RunFailure`]. A digest
    /// mismatch does not: the run comes back with `verified == false`.
    pub fn run(&self, file: &Path, algorithm: &Algorithm) -> Result<BenchmarkRun, RunFailure> {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        let fail = |phase: Phase, reason: String| RunFailure {
            file: file_name.clone(),
            algorithm: algorithm.label.clone(),
            phase,
            reason,
        };

        let original_bytes = match fs::metadata(file) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => meta.len(),
            Ok(_) => return Err(fail(Phase::Compress, "input is empty".into())),
            Err(e) => return Err(fail(Phase::Compress, format!("cannot read input: {}", e))),
        };

        let (compressed, roundtrip) = self.artifact_paths(&file_name, algorithm);

        let result = self.measure(
            file,
            &file_name,
            algorithm,
            (compressed.as_path(), roundtrip.as_path()),
            original_bytes,
        );
        if !self.keep_artifacts || result.is_err() {
            fs::remove_file(&compressed).ok();
            fs::remove_file(&roundtrip).ok();
        }

        result.map_err(|(phase, reason)| fail(phase, reason))
    }

    fn measure(
        &self,
        file: &Path,
        file_name: &str,
        algorithm: &Algorithm,
        (compressed, roundtrip): (&Path, &Path),
        original_bytes: u64,
    ) -> Result<BenchmarkRun, (Phase, String)> {
        let compress = self
            .step(&algorithm.compress, file, compressed)
            .map_err(|reason| (Phase::Compress, reason))?;

        let compressed_bytes = fs::metadata(compressed).map(|m| m.len()).unwrap_or(0);
        if compressed_bytes == 0 {
            return Err((Phase::Compress, "compressor produced no output".into()));
        }

        let decompress = self
            .step(&algorithm.decompress, compressed, roundtrip)
            .map_err(|reason| (Phase::Decompress, reason))?;

        let verified =
            verify::verify(file, roundtrip).map_err(|e| (Phase::Verify, e.to_string()))?;

        let run = BenchmarkRun::new(
            file_name,
            algorithm.label.clone(),
            original_bytes,
            compressed_bytes,
            compress.elapsed,
            decompress.elapsed,
            verified,
        );

        if !verified {
            warn!(
                file = %run.file,
                algorithm = %run.algorithm,
                "round-trip digest mismatch"
            );
        }
        debug!(
            file = %run.file,
            algorithm = %run.algorithm,
            ratio = ?run.ratio,
            compress_secs = run.compress_secs,
            decompress_secs = run.decompress_secs,
            "run complete"
        );

        Ok(run)
    }

    fn step(
        &self,
        command: &CommandTemplate,
        input: &Path,
        output: &Path,
    ) -> Result<Invocation, String> {
        let invocation = self
            .invoker
            .invoke(command, input, output)
            .map_err(|e| format!("failed to run `{}`: {}", command.program, e))?;

        if invocation.success {
            return Ok(invocation);
        }

        let status = invocation
            .code
            .map_or_else(|| "a signal".to_string(), |c| format!("status {}", c));
        let detail = invocation.stderr.lines().next().unwrap_or("");
        if detail.is_empty() {
            Err(format!("`{}` exited with {}", command.program, status))
        } else {
            Err(format!("`{}` exited with {}: {}", command.program, status, detail))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::Codec;
    use crate::metrics::Aggregator;
    use std::cell::Cell;

    /// "Compresses" by keeping the first half of the input; "decompresses" by
    /// restoring the original, which it remembers.
    struct HalvingInvoker {
        original: PathBuf,
        compress_time: Duration,
        decompress_time: Duration,
        fail_compress: bool,
        fail_decompress: bool,
        corrupt: bool,
        calls: Cell<usize>,
    }

    impl HalvingInvoker {
        fn new(original: &Path) -> Self {
            Self {
                original: original.to_path_buf(),
                compress_time: Duration::from_secs(1),
                decompress_time: Duration::from_millis(500),
                fail_compress: false,
                fail_decompress: false,
                corrupt: false,
                calls: Cell::new(0),
            }
        }
    }

    impl Invoker for HalvingInvoker {
        fn invoke(
            &self,
            command: &CommandTemplate,
            input: &Path,
            output: &Path,
        ) -> io::Result<Invocation> {
            self.calls.set(self.calls.get() + 1);
            if command.args.iter().any(|a| a == "-d") {
                if self.fail_decompress {
                    // partial output before dying
                    fs::write(output, b"trunc")?;
                    return Ok(Invocation::failed(Duration::ZERO, 2, "xz: corrupt input"));
                }
                let mut data = fs::read(&self.original)?;
                if self.corrupt {
                    data[0] ^= 0xFF;
                }
                fs::write(output, data)?;
                Ok(Invocation::ok(self.decompress_time))
            } else if self.fail_compress {
                Ok(Invocation::failed(Duration::ZERO, 1, "gzip: boom\nmore"))
            } else {
                let data = fs::read(input)?;
                fs::write(output, &data[..data.len() / 2])?;
                Ok(Invocation::ok(self.compress_time))
            }
        }
    }

    fn corpus_file(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_halving_run_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let file = corpus_file(dir.path(), "mozilla", 1_048_576);
        let runner = Runner::with_invoker(dir.path(), HalvingInvoker::new(&file));

        let run = runner.run(&file, &Algorithm::new(Codec::Gzip, 6)).unwrap();
        assert_eq!(run.file, "mozilla");
        assert_eq!(run.algorithm, "gzip-6");
        assert_eq!(run.compressed_bytes, 524_288);
        assert_eq!(run.ratio, Some(2.0));
        assert_eq!(run.compress_mbps, Some(1.0));
        assert_eq!(run.decompress_mbps, Some(2.0));
        assert!(run.verified);
    }

    #[test]
    fn test_artifacts_removed_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = corpus_file(dir.path(), "x-ray", 4096);
        let algo = Algorithm::new(Codec::Xz, 9);
        let runner = Runner::with_invoker(dir.path(), HalvingInvoker::new(&file));

        runner.run(&file, &algo).unwrap();
        let (compressed, roundtrip) = runner.artifact_paths("x-ray", &algo);
        assert!(!compressed.exists());
        assert!(!roundtrip.exists());

        let runner = runner.keep_artifacts(true);
        runner.run(&file, &algo).unwrap();
        assert!(compressed.exists());
        assert!(roundtrip.exists());
    }

    #[test]
    fn test_artifact_paths_unique_per_triple() {
        let runner = Runner::new("/work");
        let (a, _) = runner.artifact_paths("dickens", &Algorithm::new(Codec::Gzip, 1));
        let (b, _) = runner.artifact_paths("dickens", &Algorithm::new(Codec::Gzip, 9));
        let (c, c_out) = runner.artifact_paths("samba", &Algorithm::new(Codec::Gzip, 1));
        assert_eq!(a, PathBuf::from("/work/dickens.gzip-1.gz"));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(c_out, PathBuf::from("/work/samba.gzip-1.out"));
    }

    #[test]
    fn test_compress_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = corpus_file(dir.path(), "nci", 1024);
        let mut invoker = HalvingInvoker::new(&file);
        invoker.fail_compress = true;
        let runner = Runner::with_invoker(dir.path(), invoker);

        let failure = runner.run(&file, &Algorithm::new(Codec::Gzip, 9)).unwrap_err();
        assert_eq!(failure.phase, Phase::Compress);
        assert_eq!(failure.algorithm, "gzip-9");
        assert_eq!(failure.reason, "`gzip` exited with status 1: gzip: boom");
        // decompressor never ran
        assert_eq!(runner.invoker.calls.get(), 1);
    }

    #[test]
    fn test_decompress_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = corpus_file(dir.path(), "webster", 8192);
        let mut invoker = HalvingInvoker::new(&file);
        invoker.fail_decompress = true;
        let runner = Runner::with_invoker(dir.path(), invoker).keep_artifacts(true);
        let algo = Algorithm::new(Codec::Xz, 6);

        let failure = runner.run(&file, &algo).unwrap_err();
        assert_eq!(failure.phase, Phase::Decompress);
        assert_eq!(failure.file, "webster");
        assert_eq!(failure.algorithm, "xz-6");
        assert_eq!(failure.reason, "`xz` exited with status 2: xz: corrupt input");
        assert_eq!(runner.invoker.calls.get(), 2);

        // removed even when artifacts are kept
        let (compressed, roundtrip) = runner.artifact_paths("webster", &algo);
        assert!(!compressed.exists());
        assert!(!roundtrip.exists());

        let mut agg = Aggregator::new();
        agg.add_failure(failure);
        assert!(agg.summarize().is_empty());
        assert!(agg.totals().is_empty());
        assert_eq!(agg.failures().len(), 1);
    }

    #[test]
    fn test_empty_input_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = corpus_file(dir.path(), "empty", 0);
        let runner = Runner::with_invoker(dir.path(), HalvingInvoker::new(&file));

        let failure = runner.run(&file, &Algorithm::new(Codec::Zstd, 1)).unwrap_err();
        assert_eq!(failure.reason, "input is empty");
        assert_eq!(runner.invoker.calls.get(), 0);

        let missing = dir.path().join("missing");
        assert!(runner.run(&missing, &Algorithm::new(Codec::Zstd, 1)).is_err());
    }

    #[test]
    fn test_single_byte_compresses_to_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let file = corpus_file(dir.path(), "one", 1);
        let runner = Runner::with_invoker(dir.path(), HalvingInvoker::new(&file));

        let failure = runner.run(&file, &Algorithm::new(Codec::Bzip2, 1)).unwrap_err();
        assert_eq!(failure.reason, "compressor produced no output");
    }

    #[test]
    fn test_mismatch_keeps_run() {
        let dir = tempfile::tempdir().unwrap();
        let file = corpus_file(dir.path(), "ooffice", 2048);
        let mut invoker = HalvingInvoker::new(&file);
        invoker.corrupt = true;
        let runner = Runner::with_invoker(dir.path(), invoker);

        let run = runner.run(&file, &Algorithm::new(Codec::Zstd, 19)).unwrap();
        assert!(!run.verified);
        assert_eq!(run.ratio, Some(2.0));
    }

    #[test]
    fn test_missing_program_is_run_failure() {
        let dir = tempfile::tempdir().unwrap();
        let file = corpus_file(dir.path(), "reymont", 128);
        let algo = Algorithm::new(Codec::Gzip, 1).with_commands(
            CommandTemplate::new("squeezebench-no-such-binary", ["{input}"]),
            CommandTemplate::new("squeezebench-no-such-binary", ["-d", "{input}"]),
        );

        let failure = Runner::new(dir.path()).run(&file, &algo).unwrap_err();
        assert_eq!(failure.phase, Phase::Compress);
        assert!(failure.reason.starts_with("failed to run `squeezebench-no-such-binary`"));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_invoker_identity() {
        let dir = tempfile::tempdir().unwrap();
        let file = corpus_file(dir.path(), "sao", 10_000);
        let cat = CommandTemplate::new("cat", ["{input}"]);
        let algo = Algorithm::new(Codec::Gzip, 1).with_commands(cat.clone(), cat);

        let run = Runner::new(dir.path()).run(&file, &algo).unwrap();
        assert_eq!(run.compressed_bytes, 10_000);
        assert_eq!(run.ratio, Some(1.0));
        assert!(run.verified);
        assert!(run.compress_secs > 0.0);
    }
}
