//! Integrity fingerprint of the SSOT document.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::canonical::canonical_hash;
use crate::config::ServerConfig;

/// Outcome of hashing the SSOT document.
///
/// A read failure is reported as the `Error` variant rather than as a
/// protocol error, so callers always receive a result payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SsotReport {
    Valid {
        path: String,
        /// Raw size on disk in bytes.
        size: u64,
        /// Count of `\n`-delimited segments of the raw content.
        lines: usize,
        /// Lowercase hex SHA-256 of the canonical content.
        hash: String,
    },
    Error {
        message: String,
    },
}

impl SsotReport {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn hash(&self) -> Option<&str> {
        match self {
            Self::Valid { hash, .. } => Some(hash),
            Self::Error { .. } => None,
        }
    }
}

/// Validates the SSOT document configured in `config`.
pub fn validate_ssot(config: &ServerConfig) -> SsotReport {
    validate_file(&config.ssot_file())
}

/// Reads `path`, canonicalizes it and computes its content hash.
pub fn validate_file(path: &Path) -> SsotReport {
    // Invalid UTF-8 is replaced rather than rejected; only I/O failures are errors.
    let read = fs::metadata(path).and_then(|meta| {
        let bytes = fs::read(path)?;
        Ok((meta.len(), String::from_utf8_lossy(&bytes).into_owned()))
    });

    match read {
        Ok((size, content)) => SsotReport::Valid {
            path: path.display().to_string(),
            size,
            lines: content.split('\n').count(),
            hash: canonical_hash(&content),
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read SSOT document");
            SsotReport::Error {
                message: format!("{}: {}", path.display(), e),
            }
        }
    }
}

/// Compares the document's current hash against `expected`.
///
/// Returns the computed hash and whether it matches (case-insensitively).
pub fn verify_integrity(path: &Path, expected: &str) -> Option<(String, bool)> {
    match validate_file(path) {
        SsotReport::Valid { hash, .. } => {
            let matches = hash.eq_ignore_ascii_case(expected.trim());
            Some((hash, matches))
        }
        SsotReport::Error { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_report_serializes_with_status_tag() {
        let report = SsotReport::Error {
            message: "gone".to_string(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "gone");
    }

    #[test]
    fn test_lines_and_size_use_raw_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.md");
        fs::write(&path, "a  \r\nb\n").unwrap();

        match validate_file(&path) {
            SsotReport::Valid { size, lines, .. } => {
                assert_eq!(size, 7);
                assert_eq!(lines, 3);
            }
            other => panic!("expected valid report, got {other:?}"),
        }
    }
}
