use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use strix_dashboard::{ExportFormat, ReportStore, ScanError, Severity};

const REPORT: &str = "\
# Penetration Test Report

**Generated:** 2024-03-01 10:30:00 UTC

## Summary

Two findings, one high severity.
";

const CSV: &str = "\
id,title,severity
vuln-11aa22bb,SQL Injection,high
vuln-33cc44dd,Reflected XSS,medium
";

const VULN_DETAIL: &str = "\
# SQL Injection in login form

**Severity:** high
**Found:** 2024-03-01 10:15:42 UTC

The `username` parameter is concatenated into a SQL query.
";

fn seed_full_run(runs_dir: &Path, name: &str) {
    let dir = runs_dir.join(name);
    fs::create_dir_all(dir.join("vulnerabilities")).unwrap();
    fs::write(dir.join("penetration_test_report.md"), REPORT).unwrap();
    fs::write(dir.join("vulnerabilities.csv"), CSV).unwrap();
    fs::write(
        dir.join("vulnerabilities").join("vuln-11aa22bb.md"),
        VULN_DETAIL,
    )
    .unwrap();
}

#[test]
fn test_report_content_and_missing_report() {
    let runs = TempDir::new().unwrap();
    seed_full_run(runs.path(), "run-x");
    let store = ReportStore::new(runs.path());

    assert_eq!(store.report_content("run-x").unwrap(), REPORT);
    assert!(store.has_report("run-x"));
    assert!(!store.has_report("run-y"));
    assert!(matches!(
        store.report_content("run-y"),
        Err(ScanError::ReportNotFound(_))
    ));
}

#[test]
fn test_list_vulnerabilities_from_csv() {
    let runs = TempDir::new().unwrap();
    seed_full_run(runs.path(), "run-x");
    let store = ReportStore::new(runs.path());

    let rows = store.list_vulnerabilities("run-x");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], "vuln-11aa22bb");
    assert_eq!(rows[0]["severity"], "high");
    assert_eq!(rows[1]["title"], "Reflected XSS");
    assert_eq!(store.finding_count("run-x"), 2);

    // Missing CSV degrades to an empty list, not an error
    assert!(store.list_vulnerabilities("run-missing").is_empty());
}

#[test]
fn test_vulnerability_report_parses_markdown_fields() {
    let runs = TempDir::new().unwrap();
    seed_full_run(runs.path(), "run-x");
    let store = ReportStore::new(runs.path());

    let report = store.vulnerability_report("run-x", "vuln-11aa22bb").unwrap();
    assert_eq!(report.id, "vuln-11aa22bb");
    assert_eq!(report.title, "SQL Injection in login form");
    assert_eq!(report.severity, Severity::High);
    assert_eq!(report.timestamp, "2024-03-01 10:15:42 UTC");
    assert_eq!(report.markdown, VULN_DETAIL);

    assert!(matches!(
        store.vulnerability_report("run-x", "vuln-nope"),
        Err(ScanError::VulnerabilityNotFound { .. })
    ));
}

#[test]
fn test_generated_at_parses_both_timestamp_forms() {
    let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
    assert_eq!(ReportStore::generated_at(REPORT), Some(expected));

    let rfc3339 = "# Report\n\n**Generated:** 2024-03-01T10:30:00Z\n";
    assert_eq!(ReportStore::generated_at(rfc3339), Some(expected));

    assert_eq!(ReportStore::generated_at("# Report with no marker"), None);
    assert_eq!(
        ReportStore::generated_at("**Generated:** sometime recently"),
        None
    );
}

#[test]
fn test_latest_run_name_picks_newest_directory() {
    let runs = TempDir::new().unwrap();
    let store = ReportStore::new(runs.path());
    assert_eq!(store.latest_run_name(), None);

    fs::create_dir(runs.path().join("run-old")).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));
    fs::create_dir(runs.path().join("run-new")).unwrap();
    fs::create_dir(runs.path().join(".hidden")).unwrap();
    fs::write(runs.path().join("stray.txt"), "x").unwrap();

    assert_eq!(store.latest_run_name().as_deref(), Some("run-new"));
}

#[test]
fn test_export_format_parsing() {
    assert_eq!(ExportFormat::from_str("md").unwrap(), ExportFormat::Markdown);
    assert_eq!(
        ExportFormat::from_str("MARKDOWN").unwrap(),
        ExportFormat::Markdown
    );
    assert_eq!(ExportFormat::from_str("json").unwrap(), ExportFormat::Json);
    assert_eq!(ExportFormat::from_str("csv").unwrap(), ExportFormat::Csv);
    assert_eq!(ExportFormat::from_str("pdf").unwrap(), ExportFormat::Pdf);
    assert!(matches!(
        ExportFormat::from_str("docx"),
        Err(ScanError::InvalidExportFormat(_))
    ));
}

#[test]
fn test_export_markdown_and_csv_are_raw_artifacts() {
    let runs = TempDir::new().unwrap();
    seed_full_run(runs.path(), "run-x");
    let store = ReportStore::new(runs.path());

    let md = store.export("run-x", ExportFormat::Markdown).unwrap();
    assert_eq!(md.bytes, REPORT.as_bytes());
    assert_eq!(md.content_type, "text/markdown; charset=utf-8");
    assert_eq!(md.filename, "run-x.md");

    let csv = store.export("run-x", ExportFormat::Csv).unwrap();
    assert_eq!(csv.bytes, CSV.as_bytes());
    assert_eq!(csv.filename, "run-x.csv");
}

#[test]
fn test_export_json_bundles_report_and_findings() {
    let runs = TempDir::new().unwrap();
    seed_full_run(runs.path(), "run-x");
    let store = ReportStore::new(runs.path());

    let payload = store.export("run-x", ExportFormat::Json).unwrap();
    assert_eq!(payload.content_type, "application/json");
    let value: serde_json::Value = serde_json::from_slice(&payload.bytes).unwrap();
    assert_eq!(value["run_name"], "run-x");
    assert_eq!(value["report"], REPORT);
    assert_eq!(value["vulnerabilities"].as_array().unwrap().len(), 2);
    assert!(value["exported_at"].is_string());
}

#[test]
fn test_export_pdf_produces_pdf_bytes() {
    let runs = TempDir::new().unwrap();
    seed_full_run(runs.path(), "run-x");
    let store = ReportStore::new(runs.path());

    let payload = store.export("run-x", ExportFormat::Pdf).unwrap();
    assert_eq!(payload.content_type, "application/pdf");
    assert_eq!(payload.filename, "run-x.pdf");
    assert!(payload.bytes.starts_with(b"%PDF"));
}

#[test]
fn test_export_missing_run_is_not_found() {
    let runs = TempDir::new().unwrap();
    let store = ReportStore::new(runs.path());
    for format in [
        ExportFormat::Markdown,
        ExportFormat::Json,
        ExportFormat::Csv,
        ExportFormat::Pdf,
    ] {
        assert!(matches!(
            store.export("run-missing", format),
            Err(ScanError::ReportNotFound(_))
        ));
    }
}
