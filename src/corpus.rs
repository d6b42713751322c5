//! The benchmark input: a directory of regular files.

use crate::error::{BenchError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// One input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    /// Full path
    pub path: PathBuf,
    /// File name as reported in results
    pub name: String,
    /// Size at scan time
    pub size: u64,
}

/// Regular files of a corpus directory, sorted by name.
#[derive(Debug, Clone)]
pub struct Corpus {
    root: PathBuf,
    files: Vec<CorpusFile>,
}

impl Corpus {
    /// Scans `root`. Subdirectories, symlinks to directories and dotfiles are
    /// skipped. A corpus without any file is an error.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let entries = fs::read_dir(root)
            .map_err(|e| BenchError::Corpus(format!("{}: {}", root.display(), e)))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BenchError::io(root, e))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            let meta = fs::metadata(&path).map_err(|e| BenchError::io(&path, e))?;
            if !meta.is_file() {
                continue;
            }

            files.push(CorpusFile {
                path,
                name,
                size: meta.len(),
            });
        }

        if files.is_empty() {
            return Err(BenchError::Corpus(format!(
                "no files in {}",
                root.display()
            )));
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    /// Directory the corpus was read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files in processing order.
    pub fn files(&self) -> &[CorpusFile] {
        &self.files
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Always false for an opened corpus.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of file sizes.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}
