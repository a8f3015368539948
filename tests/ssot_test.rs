use ssot_mcp::canonical::*;
use ssot_mcp::config::ServerConfig;
use ssot_mcp::ssot::*;
use std::fs;
use tempfile::TempDir;

fn config_for(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        root_dir: dir.path().to_string_lossy().to_string(),
        ..ServerConfig::default()
    }
}

fn write_ssot(dir: &TempDir, content: &str) {
    let path = dir.path().join(".github");
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join("copilot-instructions.md"), content).unwrap();
}

#[test]
fn test_valid_report() {
    let dir = TempDir::new().unwrap();
    write_ssot(&dir, "# Codex\n\nrule one\n");

    let report = validate_ssot(&config_for(&dir));
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "valid");
    assert_eq!(json["size"], 18);
    assert_eq!(json["lines"], 4);
    assert_eq!(json["hash"], canonical_hash("# Codex\n\nrule one"));

    let hash = report.hash().unwrap();
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn test_hash_stable_across_runs() {
    let dir = TempDir::new().unwrap();
    write_ssot(&dir, "stable content\n");
    let config = config_for(&dir);
    assert_eq!(validate_ssot(&config), validate_ssot(&config));
}

#[test]
fn test_hash_ignores_whitespace_and_line_endings() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);

    write_ssot(&dir, "alpha\nbeta\n");
    let base = validate_ssot(&config).hash().unwrap().to_string();

    write_ssot(&dir, "alpha   \r\nbeta\r\n");
    assert_eq!(validate_ssot(&config).hash().unwrap(), base);

    write_ssot(&dir, "alpha\nbetA\n");
    assert_ne!(validate_ssot(&config).hash().unwrap(), base);
}

#[test]
fn test_missing_document_is_error_status() {
    let dir = TempDir::new().unwrap();
    let report = validate_ssot(&config_for(&dir));
    assert!(!report.is_valid());
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "error");
    assert!(json["message"].as_str().unwrap().contains("copilot-instructions.md"));
}

#[test]
fn test_verify_integrity() {
    let dir = TempDir::new().unwrap();
    write_ssot(&dir, "body\n");
    let path = dir.path().join(".github/copilot-instructions.md");
    let expected = canonical_hash("body");

    assert_eq!(verify_integrity(&path, &expected), Some((expected.clone(), true)));
    assert_eq!(
        verify_integrity(&path, &expected.to_uppercase()),
        Some((expected.clone(), true))
    );
    assert_eq!(verify_integrity(&path, "00"), Some((expected, false)));
    assert_eq!(verify_integrity(&dir.path().join("nope.md"), "00"), None);
}

#[test]
fn test_invalid_utf8_still_hashed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".github");
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join("copilot-instructions.md"), b"caf\xe9 rules\n").unwrap();

    let report = validate_ssot(&config_for(&dir));
    match report {
        SsotReport::Valid { size, lines, hash, .. } => {
            assert_eq!(size, 11);
            assert_eq!(lines, 2);
            assert_eq!(hash, canonical_hash("caf\u{fffd} rules"));
        }
        other => panic!("expected valid report, got {other:?}"),
    }
}
