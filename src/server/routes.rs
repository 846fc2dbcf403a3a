//! REST route handlers

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ScanError;
use crate::reports::ExportFormat;
use crate::types::{ScanConfig, Severity, Target};

use super::{ApiError, AppState};

/// Request body for scan creation
#[derive(Debug, Deserialize)]
pub struct CreateScanRequest {
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub user_instructions: String,
    #[serde(default = "ScanConfig::default_llm_model")]
    pub llm_model: String,
    #[serde(default = "ScanConfig::default_max_iterations")]
    pub max_iterations: u32,
    pub name: Option<String>,
}

/// Request body for user chat messages
#[derive(Debug, Deserialize)]
pub struct UserMessageRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default = "ExportQuery::default_format")]
    pub format: String,
}

impl ExportQuery {
    fn default_format() -> String {
        "md".to_string()
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Strix Dashboard API",
        "version": crate::VERSION,
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Create a session and immediately begin supervision
pub async fn create_scan(
    State(state): State<AppState>,
    Json(request): Json<CreateScanRequest>,
) -> Result<Json<Value>, ApiError> {
    let config = ScanConfig {
        targets: request.targets,
        user_instructions: request.user_instructions,
        llm_model: request.llm_model,
        max_iterations: request.max_iterations,
    };

    let session = state.registry.create(config, request.name).await?;
    state.supervisor.start(&session.id).await;

    Ok(Json(json!({
        "id": session.id,
        "status": session.status,
        "message": "Scan started successfully",
    })))
}

pub async fn list_scans(State(state): State<AppState>) -> Json<Value> {
    let sessions = state.registry.list().await;
    let scans: Vec<Value> = sessions
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "status": s.status,
                "started_at": s.started_at,
                "completed_at": s.completed_at,
                "vulnerabilities_count": s.vulnerabilities.len(),
                "agents_count": s.agents.len(),
            })
        })
        .collect();
    Json(json!({ "scans": scans }))
}

/// Full session snapshot
pub async fn get_scan(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .registry
        .get(&scan_id)
        .await
        .ok_or_else(|| ScanError::session_not_found(&scan_id))?;
    Ok(Json(serde_json::to_value(&session).map_err(ScanError::from)?))
}

pub async fn stop_scan(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.supervisor.stop(&scan_id).await {
        return Err(ScanError::session_not_found(&scan_id).into());
    }
    Ok(Json(json!({ "message": "Scan stopped", "id": scan_id })))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
    Json(request): Json<UserMessageRequest>,
) -> Result<Json<Value>, ApiError> {
    if !state
        .supervisor
        .send_user_message(&scan_id, &request.message)
        .await
    {
        return Err(ScanError::session_not_found(&scan_id).into());
    }
    Ok(Json(json!({ "message": "Message sent", "id": scan_id })))
}

/// In-memory vulnerabilities plus a severity summary
pub async fn get_vulnerabilities(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .registry
        .get(&scan_id)
        .await
        .ok_or_else(|| ScanError::session_not_found(&scan_id))?;

    let count = |severity: Severity| -> usize {
        session
            .vulnerabilities
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    };

    Ok(Json(json!({
        "vulnerabilities": session.vulnerabilities,
        "summary": {
            "critical": count(Severity::Critical),
            "high": count(Severity::High),
            "medium": count(Severity::Medium),
            "low": count(Severity::Low),
            "info": count(Severity::Info),
        },
    })))
}

/// Raw markdown report, resolved through the session's run identifier
pub async fn get_report(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let run_name = resolve_run_name(&state, &scan_id).await?;
    let report = state.reports.report_content(&run_name)?;
    Ok(Json(json!({ "run_name": run_name, "report": report })))
}

/// Detail record for one vulnerability artifact
pub async fn get_vulnerability_report(
    State(state): State<AppState>,
    Path((scan_id, vuln_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let run_name = resolve_run_name(&state, &scan_id).await?;
    let report = state.reports.vulnerability_report(&run_name, &vuln_id)?;
    Ok(Json(serde_json::to_value(&report).map_err(ScanError::from)?))
}

/// Download the report in the requested format
pub async fn export_report(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let format: ExportFormat = query.format.parse()?;
    let run_name = resolve_run_name(&state, &scan_id).await?;
    let payload = state.reports.export(&run_name, format)?;

    let headers = [
        (header::CONTENT_TYPE, payload.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", payload.filename),
        ),
    ];
    Ok((headers, payload.bytes))
}

/// Durable run identifier for a session: session field first, then the
/// mapping store; not-found while neither knows the run yet
async fn resolve_run_name(state: &AppState, scan_id: &str) -> Result<String, ApiError> {
    let session = state
        .registry
        .get(scan_id)
        .await
        .ok_or_else(|| ScanError::session_not_found(scan_id))?;
    if let Some(run_name) = session.run_name {
        return Ok(run_name);
    }
    state
        .mappings
        .run_name_for(scan_id)
        .ok_or_else(|| ScanError::report_not_found(scan_id).into())
}
