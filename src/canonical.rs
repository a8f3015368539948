//! Deterministic text normalization and content hashing.
//!
//! Two documents that differ only in line endings, trailing whitespace on a
//! line, Unicode composition form, or leading/trailing blank space produce
//! the same canonical text and therefore the same hash.

use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Canonicalizes text before hashing.
///
/// Steps, in order:
/// 1. `CRLF` and bare `CR` become `LF`.
/// 2. Trailing whitespace is stripped from every line.
/// 3. The whole text is NFC-normalized.
/// 4. Leading and trailing whitespace of the document is stripped.
pub fn canonicalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let trimmed = unified
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    let composed: String = trimmed.nfc().collect();
    composed.trim().to_string()
}

/// Compute the lowercase hex SHA-256 digest of `content`'s UTF-8 bytes.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}

/// Hash of the canonical form of `text`.
pub fn canonical_hash(text: &str) -> String {
    content_hash(&canonicalize(text))
}
