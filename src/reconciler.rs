//! Startup reconciliation of on-disk run artifacts
//!
//! A prior service run (or a worker launched by hand) may have left artifact
//! directories with no in-memory session. Reconciliation runs once before
//! the service accepts sessions, synthesizes minimal historical session
//! records for untracked runs and persists fresh id-to-run mappings. It only
//! ever adds entries; sessions and mappings already present are untouched.

use std::fs;

use chrono::Utc;

use crate::error::Result;
use crate::persistence::MappingStore;
use crate::registry::SessionRegistry;
use crate::reports::{REPORT_FILE, ReportStore, VULNERABILITIES_CSV};
use crate::types::{ScanConfig, ScanSession, ScanStatus};

/// Discover prior run artifacts and register them as historical sessions
///
/// A run directory is a candidate when it carries a recognized artifact
/// (report markdown or findings CSV). Returns the number of sessions
/// synthesized; running twice against an unchanged tree synthesizes none the
/// second time.
///
/// # Errors
/// Only a missing/unreadable runs root is an error; per-directory problems
/// are logged and skipped.
pub async fn reconcile_historical(
    registry: &SessionRegistry,
    reports: &ReportStore,
    mappings: &MappingStore,
) -> Result<usize> {
    let runs_dir = reports.runs_dir();
    if !runs_dir.exists() {
        log::info!("No runs directory at {}; nothing to reconcile", runs_dir.display());
        return Ok(0);
    }

    let mut run_names: Vec<String> = fs::read_dir(runs_dir)?
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| !name.starts_with('.'))
        .collect();
    run_names.sort();

    let mut synthesized = 0;
    for run_name in run_names {
        let run_dir = runs_dir.join(&run_name);
        let has_report = run_dir.join(REPORT_FILE).exists();
        let has_csv = run_dir.join(VULNERABILITIES_CSV).exists();
        if !has_report && !has_csv {
            continue;
        }

        let scan_id = mappings
            .scan_id_for_run(&run_name)
            .unwrap_or_else(SessionRegistry::generate_id);
        if registry.contains(&scan_id).await {
            continue;
        }

        let timestamp = reports
            .report_content(&run_name)
            .ok()
            .and_then(|content| ReportStore::generated_at(&content))
            .unwrap_or_else(Utc::now);

        let mut session =
            ScanSession::new(scan_id.clone(), Some(run_name.clone()), ScanConfig::default());
        session.status = if has_report {
            ScanStatus::Completed
        } else {
            ScanStatus::Failed
        };
        session.started_at = timestamp;
        session.completed_at = Some(timestamp);
        session.run_name = Some(run_name.clone());
        session.is_historical = true;
        session.stats.agents = 1;
        session.stats.tools = reports.finding_count(&run_name) as u32;

        if !registry.insert_historical(session).await {
            continue;
        }
        if !mappings.contains_run(&run_name) {
            mappings.add(&scan_id, &run_name, None);
        }
        log::info!("Reconciled historical run {run_name} as scan {scan_id}");
        synthesized += 1;
    }

    Ok(synthesized)
}
