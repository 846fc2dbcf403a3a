use std::fs;
use std::path::Path;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use strix_dashboard::{
    MappingStore, ReportStore, ScanStatus, SessionRegistry, reconcile_historical,
};

const REPORT: &str = "\
# Penetration Test Report

**Generated:** 2024-03-01 10:30:00 UTC

## Findings

SQL injection in the login form.
";

const CSV: &str = "\
id,title,severity
vuln-11aa22bb,SQL Injection,high
vuln-33cc44dd,Reflected XSS,medium
";

fn seed_run(runs_dir: &Path, name: &str, report: bool, csv: bool) {
    let dir = runs_dir.join(name);
    fs::create_dir_all(&dir).unwrap();
    if report {
        fs::write(dir.join("penetration_test_report.md"), REPORT).unwrap();
    }
    if csv {
        fs::write(dir.join("vulnerabilities.csv"), CSV).unwrap();
    }
}

#[tokio::test]
async fn test_reconcile_synthesizes_historical_session() {
    let runs = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    seed_run(runs.path(), "run-20240301-103000", true, true);

    let registry = SessionRegistry::new();
    let reports = ReportStore::new(runs.path());
    let mappings = MappingStore::open(data.path());

    let count = reconcile_historical(&registry, &reports, &mappings)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let sessions = registry.list().await;
    assert_eq!(sessions.len(), 1);
    let session = &sessions[0];
    assert!(session.is_historical);
    assert_eq!(session.status, ScanStatus::Completed);
    assert_eq!(session.run_name.as_deref(), Some("run-20240301-103000"));
    assert_eq!(session.stats.agents, 1);
    assert_eq!(session.stats.tools, 2);

    // Timestamp parsed from the report's generated marker
    let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
    assert_eq!(session.started_at, expected);
    assert_eq!(session.completed_at, Some(expected));

    // A mapping is persisted for the synthesized id
    assert_eq!(
        mappings.run_name_for(&session.id).as_deref(),
        Some("run-20240301-103000")
    );
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let runs = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    seed_run(runs.path(), "run-a", true, false);
    seed_run(runs.path(), "run-b", false, true);

    let registry = SessionRegistry::new();
    let reports = ReportStore::new(runs.path());
    let mappings = MappingStore::open(data.path());

    let first = reconcile_historical(&registry, &reports, &mappings)
        .await
        .unwrap();
    assert_eq!(first, 2);
    let second = reconcile_historical(&registry, &reports, &mappings)
        .await
        .unwrap();
    assert_eq!(second, 0);
    assert_eq!(registry.list().await.len(), 2);
    assert_eq!(mappings.len(), 2);
}

#[tokio::test]
async fn test_reconcile_reuses_persisted_scan_ids() {
    let runs = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    seed_run(runs.path(), "run-persisted", true, false);

    let reports = ReportStore::new(runs.path());

    let original_id = {
        let registry = SessionRegistry::new();
        let mappings = MappingStore::open(data.path());
        reconcile_historical(&registry, &reports, &mappings)
            .await
            .unwrap();
        registry.list().await[0].id.clone()
    };

    // New process: fresh registry, mapping file reloaded from disk
    let registry = SessionRegistry::new();
    let mappings = MappingStore::open(data.path());
    assert_eq!(
        mappings.scan_id_for_run("run-persisted").as_deref(),
        Some(original_id.as_str())
    );

    reconcile_historical(&registry, &reports, &mappings)
        .await
        .unwrap();
    assert_eq!(registry.list().await[0].id, original_id);
    assert_eq!(mappings.len(), 1);
}

#[tokio::test]
async fn test_csv_only_run_is_marked_failed() {
    let runs = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    seed_run(runs.path(), "run-interrupted", false, true);

    let registry = SessionRegistry::new();
    let reports = ReportStore::new(runs.path());
    let mappings = MappingStore::open(data.path());
    reconcile_historical(&registry, &reports, &mappings)
        .await
        .unwrap();

    let session = &registry.list().await[0];
    assert_eq!(session.status, ScanStatus::Failed);
    assert_eq!(session.stats.tools, 2);
}

#[tokio::test]
async fn test_reconcile_skips_noise_directories() {
    let runs = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    // Dot directories, empty directories and stray files are all ignored
    fs::create_dir_all(runs.path().join(".cache")).unwrap();
    fs::write(
        runs.path().join(".cache").join("penetration_test_report.md"),
        REPORT,
    )
    .unwrap();
    fs::create_dir_all(runs.path().join("run-empty")).unwrap();
    fs::write(runs.path().join("notes.txt"), "not a run").unwrap();

    let registry = SessionRegistry::new();
    let reports = ReportStore::new(runs.path());
    let mappings = MappingStore::open(data.path());
    let count = reconcile_historical(&registry, &reports, &mappings)
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert!(registry.list().await.is_empty());
}

#[tokio::test]
async fn test_missing_runs_root_reconciles_nothing() {
    let runs = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let registry = SessionRegistry::new();
    let reports = ReportStore::new(runs.path().join("does-not-exist"));
    let mappings = MappingStore::open(data.path());

    let count = reconcile_historical(&registry, &reports, &mappings)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
