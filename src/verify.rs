//! Round-trip integrity checks by content digest.

use crate::error::{BenchError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// SHA-256 of the full contents of `path`.
pub fn digest(path: &Path) -> Result<[u8; 32]> {
    let file = File::open(path).map_err(|e| BenchError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(|e| BenchError::io(path, e))?;
    Ok(hasher.finalize().into())
}

/// Returns `true` when both files have identical contents.
///
/// A size check runs first so large mismatches skip the hashing.
pub fn verify(original: &Path, decompressed: &Path) -> Result<bool> {
    let original_len = std::fs::metadata(original)
        .map_err(|e| BenchError::io(original, e))?
        .len();
    let decompressed_len = std::fs::metadata(decompressed)
        .map_err(|e| BenchError::io(decompressed, e))?
        .len();
    if original_len != decompressed_len {
        return Ok(false);
    }

    Ok(digest(original)? == digest(decompressed)?)
}
