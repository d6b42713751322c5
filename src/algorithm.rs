//! Codec families, quality levels and the command templates used to drive them.

use crate::error::{BenchError, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Placeholder replaced by the input path when a template is rendered.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// External compressor families.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// GNU gzip
    Gzip,
    /// bzip2
    Bzip2,
    /// xz / LZMA2
    Xz,
    /// Zstandard
    Zstd,
}

impl Codec {
    /// All supported families, in report order.
    pub const ALL: [Codec; 4] = [Codec::Gzip, Codec::Bzip2, Codec::Xz, Codec::Zstd];

    /// Binary name, also used as the label prefix.
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Gzip => "gzip",
            Codec::Bzip2 => "bzip2",
            Codec::Xz => "xz",
            Codec::Zstd => "zstd",
        }
    }

    /// Suffix of the compressed artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            Codec::Gzip => "gz",
            Codec::Bzip2 => "bz2",
            Codec::Xz => "xz",
            Codec::Zstd => "zst",
        }
    }

    /// Levels benchmarked by default.
    pub fn reference_levels(&self) -> [u32; 3] {
        match self {
            Codec::Gzip => [1, 6, 9],
            Codec::Bzip2 => [1, 5, 9],
            Codec::Xz => [1, 6, 9],
            Codec::Zstd => [1, 10, 19],
        }
    }

    /// Inclusive range of levels the binary accepts.
    pub fn level_range(&self) -> (u32, u32) {
        match self {
            Codec::Gzip | Codec::Bzip2 => (1, 9),
            Codec::Xz => (0, 9),
            Codec::Zstd => (1, 19),
        }
    }

    fn compress_template(&self, level: u32) -> CommandTemplate {
        let level_flag = format!("-{}", level);
        let args: Vec<&str> = match self {
            Codec::Zstd => vec![level_flag.as_str(), "-q", "-c", INPUT_PLACEHOLDER],
            _ => vec![level_flag.as_str(), "-c", INPUT_PLACEHOLDER],
        };
        CommandTemplate::new(self.name(), args)
    }

    fn decompress_template(&self) -> CommandTemplate {
        let args = match self {
            Codec::Zstd => vec!["-d", "-q", "-c", INPUT_PLACEHOLDER],
            _ => vec!["-d", "-c", INPUT_PLACEHOLDER],
        };
        CommandTemplate::new(self.name(), args)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        Codec::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BenchError::UnknownAlgorithm(s.to_string()))
    }
}

/// An external command whose stdout is the produced artifact.
///
/// Arguments equal to [`INPUT_PLACEHOLDER`] are substituted with the input path
/// at render time; everything else is passed through verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandTemplate {
    /// Program to spawn
    pub program: String,
    /// Arguments, possibly containing the input placeholder
    pub args: Vec<String>,
}

impl CommandTemplate {
    /// Builds a template from a program name and argument list.
    pub fn new<S: AsRef<str>>(program: &str, args: impl IntoIterator<Item = S>) -> Self {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(|a| a.as_ref().to_string()).collect(),
        }
    }

    /// Splits a whitespace-separated command line such as `gzip -d -c {input}`.
    ///
    /// Returns `None` for an empty string.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program, parts))
    }

    /// Produces the concrete argument list for `input`.
    pub fn render(&self, input: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(|arg| {
                if arg == INPUT_PLACEHOLDER {
                    input.as_os_str().to_os_string()
                } else {
                    OsString::from(arg)
                }
            })
            .collect()
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// One benchmark configuration: a codec at a fixed level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Algorithm {
    /// Codec family
    pub codec: Codec,
    /// Quality level passed to the compressor
    pub level: u32,
    /// Grouping label, e.g. `xz-9`
    pub label: String,
    /// Compression command, stdout = compressed artifact
    pub compress: CommandTemplate,
    /// Decompression command, stdout = round-tripped file
    pub decompress: CommandTemplate,
    /// Suffix of the compressed artifact
    pub extension: String,
}

impl Algorithm {
    /// Standard invocation of `codec` at `level`.
    pub fn new(codec: Codec, level: u32) -> Self {
        Self {
            codec,
            level,
            label: format!("{}-{}", codec.name(), level),
            compress: codec.compress_template(level),
            decompress: codec.decompress_template(),
            extension: codec.extension().to_string(),
        }
    }

    /// Replaces both command templates, keeping label and extension.
    pub fn with_commands(mut self, compress: CommandTemplate, decompress: CommandTemplate) -> Self {
        self.compress = compress;
        self.decompress = decompress;
        self
    }

    /// Parses a label such as `zstd-19`.
    pub fn from_label(label: &str) -> Result<Self> {
        let (family, level) = label
            .trim()
            .rsplit_once('-')
            .ok_or_else(|| BenchError::UnknownAlgorithm(label.to_string()))?;
        let codec: Codec = family.parse()?;
        let level: u32 = level
            .parse()
            .map_err(|_| BenchError::UnknownAlgorithm(label.to_string()))?;
        checked(codec, level)
    }

    /// Programs that must be installed to run this configuration.
    pub fn programs(&self) -> Vec<&str> {
        let mut programs = vec![self.compress.program.as_str()];
        if self.decompress.program != self.compress.program {
            programs.push(self.decompress.program.as_str());
        }
        programs
    }
}

fn checked(codec: Codec, level: u32) -> Result<Algorithm> {
    let (min, max) = codec.level_range();
    if level < min || level > max {
        return Err(BenchError::UnknownAlgorithm(format!(
            "{}-{} (levels {}..={})",
            codec, level, min, max
        )));
    }
    Ok(Algorithm::new(codec, level))
}

/// The 12-configuration reference matrix: 4 codecs × 3 levels.
pub fn reference_matrix() -> Vec<Algorithm> {
    Codec::ALL
        .into_iter()
        .flat_map(|codec| {
            codec
                .reference_levels()
                .into_iter()
                .map(move |level| Algorithm::new(codec, level))
        })
        .collect()
}

/// Expands algorithm selectors into configurations.
///
/// A selector is either a family (`gzip`), expanded to `levels` or to the
/// family's reference levels, or an exact label (`zstd-19`). Duplicates are
/// dropped; first occurrence wins.
pub fn select(selectors: &[String], levels: Option<&[u32]>) -> Result<Vec<Algorithm>> {
    let mut selected: Vec<Algorithm> = Vec::new();

    for selector in selectors {
        let selector = selector.trim();
        if selector.is_empty() {
            continue;
        }

        let expanded = if selector.contains('-') {
            vec![Algorithm::from_label(selector)?]
        } else {
            let codec: Codec = selector.parse()?;
            match levels {
                Some(levels) => levels
                    .iter()
                    .map(|&level| checked(codec, level))
                    .collect::<Result<Vec<_>>>()?,
                None => codec
                    .reference_levels()
                    .into_iter()
                    .map(|level| Algorithm::new(codec, level))
                    .collect(),
            }
        };

        for algo in expanded {
            if !selected.iter().any(|a| a.label == algo.label) {
                selected.push(algo);
            }
        }
    }

    Ok(selected)
}
