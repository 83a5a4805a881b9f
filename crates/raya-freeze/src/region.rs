//! Marker-delimited region patching
//!
//! Generated text lives between two marker lines in otherwise hand-written
//! files. Both marker lines stay in place; only the lines strictly between
//! them are replaced.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while patching a region
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegionError {
    /// Marker line not present in the file
    #[error("Can't find {marker:?} in file {file}")]
    MissingMarker { marker: String, file: PathBuf },

    /// End marker at or before the start marker
    #[error("End marker {end:?} occurs before start marker {start:?} in file {file}")]
    MarkerOrder {
        start: String,
        end: String,
        file: PathBuf,
    },
}

/// A generated block and the markers around it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Text identifying the line before the block
    pub start: &'static str,
    /// Text identifying the line after the block
    pub end: &'static str,
    /// Generated lines, without line terminators
    pub lines: Vec<String>,
}

impl Region {
    pub fn new(start: &'static str, end: &'static str, lines: Vec<String>) -> Self {
        Self { start, end, lines }
    }
}

/// Index of the first line containing `marker`
pub fn find_marker(lines: &[String], marker: &str, file: &Path) -> Result<usize, RegionError> {
    lines
        .iter()
        .position(|line| line.contains(marker))
        .ok_or_else(|| RegionError::MissingMarker {
            marker: marker.to_string(),
            file: file.to_path_buf(),
        })
}

/// Replace the lines between `start` and `end` with `replacement`
///
/// The end marker is the first match below the start marker. `lines` keep
/// their terminators as read from the file and are copied unchanged outside
/// the region. Replacement lines are right-trimmed and take the start
/// marker's line ending.
pub fn patch_region(
    lines: &[String],
    start: &str,
    end: &str,
    replacement: &[String],
    file: &Path,
) -> Result<Vec<String>, RegionError> {
    let start_pos = find_marker(lines, start, file)?;
    let end_pos = match find_marker(&lines[start_pos + 1..], end, file) {
        Ok(offset) => start_pos + 1 + offset,
        Err(err) => {
            // Only present above the start marker.
            if find_marker(&lines[..=start_pos], end, file).is_ok() {
                return Err(RegionError::MarkerOrder {
                    start: start.to_string(),
                    end: end.to_string(),
                    file: file.to_path_buf(),
                });
            }
            return Err(err);
        }
    };

    let eol = if lines[start_pos].ends_with("\r\n") {
        "\r\n"
    } else {
        "\n"
    };

    let mut patched = Vec::with_capacity(lines.len() - (end_pos - start_pos - 1) + replacement.len());
    patched.extend_from_slice(&lines[..=start_pos]);
    patched.extend(
        replacement
            .iter()
            .map(|line| format!("{}{}", line.trim_end(), eol)),
    );
    patched.extend_from_slice(&lines[end_pos..]);
    Ok(patched)
}

/// Apply several regions to one file, each to the output of the previous
pub fn patch_regions(
    lines: Vec<String>,
    regions: &[Region],
    file: &Path,
) -> Result<Vec<String>, RegionError> {
    regions.iter().try_fold(lines, |lines, region| {
        patch_region(&lines, region.start, region.end, &region.lines, file)
    })
}

/// Split text into lines, keeping each line's `\n`
pub fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}
