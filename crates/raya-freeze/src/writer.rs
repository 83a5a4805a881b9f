//! Atomic file updates
//!
//! A target file is read, transformed in memory and written to a temporary
//! file next to it, which then replaces the original. Any failure leaves the
//! original untouched and removes the temporary file.

use crate::region::split_lines;
use crate::FreezeResult;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// I/O errors raised while updating a file
#[derive(Debug, Error)]
pub enum WriteError {
    /// Failed to read the original file
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the temporary file
    #[error("Failed to write temporary file for {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to move the temporary file over the original
    #[error("Failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// The file was rewritten
    Updated,
    /// The new content equals the old; the file was left alone
    Unchanged,
}

/// Rewrite `path` with the lines returned by `patch`
///
/// `patch` receives the file's lines with their terminators, `\n` or
/// `\r\n`, exactly as read. Whatever it returns is written back verbatim.
pub fn update_file_with_tmpfile<F>(path: &Path, patch: F) -> FreezeResult<FileStatus>
where
    F: FnOnce(Vec<String>) -> FreezeResult<Vec<String>>,
{
    let original = fs::read_to_string(path).map_err(|source| WriteError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let contents = patch(split_lines(&original))?.concat();
    if contents == original {
        return Ok(FileStatus::Unchanged);
    }

    write_atomic(path, contents.as_bytes())?;
    Ok(FileStatus::Updated)
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), WriteError> {
    let write_err = |source| WriteError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), metadata.permissions()).map_err(write_err)?;
    }

    tmp.persist(path).map_err(|err| WriteError::Persist {
        path: path.to_path_buf(),
        source: err.error,
    })?;
    Ok(())
}
