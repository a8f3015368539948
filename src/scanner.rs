//! Repository file-tree snapshot.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::ServerConfig;
use crate::errors::{Result, SsotMcpError};

/// A single file seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedFile {
    pub path: String,
    pub size: u64,
}

/// Result of walking the repository tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryScanResult {
    /// Root directory that was walked.
    pub repository: String,
    /// Number of files in the entire tree.
    pub file_count: usize,
    /// The first files in traversal order, capped at the preview limit.
    pub files: Vec<ScannedFile>,
}

/// Scans the repository configured in `config`.
pub fn scan_repository(config: &ServerConfig) -> Result<RepositoryScanResult> {
    scan_directory(&config.root(), &config.exclude_dirs, config.preview_limit)
}

/// Walks `root` depth-first, skipping any entry whose name is in `exclude`.
///
/// Entries within a directory are visited in file-name order so repeated
/// scans of an unchanged tree are identical. Any filesystem error aborts the
/// scan; no partial result is returned.
pub fn scan_directory(
    root: &Path,
    exclude: &[String],
    preview_limit: usize,
) -> Result<RepositoryScanResult> {
    let mut files = Vec::new();
    let mut file_count = 0usize;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !exclude
                    .iter()
                    .any(|name| e.file_name().to_string_lossy() == name.as_str())
        });

    for entry in walker {
        let entry = entry.map_err(|e| SsotMcpError::Scan {
            path: e
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| root.display().to_string()),
            message: e.to_string(),
        })?;

        if entry.file_type().is_dir() {
            continue;
        }

        // Follows symlinks, so a dangling link fails the scan.
        let metadata = std::fs::metadata(entry.path()).map_err(|e| SsotMcpError::Scan {
            path: entry.path().display().to_string(),
            message: e.to_string(),
        })?;

        file_count += 1;
        if files.len() < preview_limit {
            files.push(ScannedFile {
                path: entry.path().display().to_string(),
                size: metadata.len(),
            });
        }
    }

    debug!(root = %root.display(), file_count, "repository scan complete");

    Ok(RepositoryScanResult {
        repository: root.display().to_string(),
        file_count,
        files,
    })
}
