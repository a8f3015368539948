use ssot_mcp::config::ServerConfig;
use ssot_mcp::smoke::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn config_for(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        root_dir: dir.path().to_string_lossy().to_string(),
        ..ServerConfig::default()
    }
}

fn write_repo_files(dir: &TempDir) {
    fs::write(dir.path().join("README.md"), "# demo\n").unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/main.ts"), "export {};\n").unwrap();
}

fn write_artifacts(dir: &TempDir) {
    fs::create_dir_all(dir.path().join(".github")).unwrap();
    fs::write(
        dir.path().join(".github/copilot-instructions.md"),
        "# Rules\n\nkeep it simple\n",
    )
    .unwrap();

    let graph = json!({
        "directed": true,
        "nodes": [
            {"id": "src/main.ts", "spectral_freq": "RED"},
            {"id": "src/view/App.tsx", "spectral_freq": "BLUE"},
            {"id": "src/view/List.tsx", "spectral_freq": "BLUE"}
        ],
        "edges": [
            {"source": "src/main.ts", "target": "src/view/App.tsx"}
        ],
        "metadata": {"validation": {"graph_is_dag": true}}
    });
    fs::write(
        dir.path().join("dependency_graph_production.json"),
        serde_json::to_string(&graph).unwrap(),
    )
    .unwrap();
}

fn check<'a>(results: &'a SmokeResults, name: &str) -> &'a ValidationResult {
    results
        .validations
        .iter()
        .find(|v| v.name == name)
        .unwrap_or_else(|| panic!("missing check {name}"))
}

#[test]
fn test_complete_repository_passes_every_check() {
    let dir = TempDir::new().unwrap();
    write_repo_files(&dir);
    write_artifacts(&dir);

    let results = run_smoke_suite(&config_for(&dir));

    assert!(results.success, "{:?}", results.validations);
    assert_eq!(results.total_validations, 5);
    assert_eq!(results.passed, 5);
    assert_eq!(results.failed, 0);
    assert!(results.validations.iter().all(|v| v.error.is_none()));

    let spectral = check(&results, "query_dependency_graph (spectral)");
    let details = spectral.details.as_ref().unwrap();
    assert_eq!(details["node_count"], 2);
    assert_eq!(details["first_node"], "src/view/App.tsx");

    let stats = check(&results, "query_dependency_graph (stats)");
    assert_eq!(stats.details.as_ref().unwrap()["total_nodes"], 3);
}

#[test]
fn test_missing_artifacts_reported_per_check() {
    let dir = TempDir::new().unwrap();
    write_repo_files(&dir);

    let results = run_smoke_suite(&config_for(&dir));

    assert!(!results.success);
    assert_eq!(results.total_validations, 5);
    assert_eq!(results.passed, 2);
    assert_eq!(results.failed, 3);

    assert!(check(&results, "ping (implicit)").passed);
    assert!(check(&results, "scan_repository").passed);

    let ssot = check(&results, "validate_ssot_integrity");
    assert!(!ssot.passed);
    assert!(ssot
        .error
        .as_deref()
        .unwrap()
        .starts_with("SSOT validation failed: "));

    for name in [
        "query_dependency_graph (stats)",
        "query_dependency_graph (spectral)",
    ] {
        let result = check(&results, name);
        assert!(!result.passed);
        assert!(result.details.is_none());
        assert_eq!(
            result.error.as_deref(),
            Some("dependency_graph_production.json not found")
        );
    }
}

#[test]
fn test_empty_repository_fails_scan() {
    let dir = TempDir::new().unwrap();

    let results = run_smoke_suite(&config_for(&dir));
    let scan = check(&results, "scan_repository");
    assert!(!scan.passed);
    assert_eq!(scan.error.as_deref(), Some("Invalid file count"));
    assert_eq!(results.failed, 4);
}
