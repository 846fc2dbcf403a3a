//! HTTP and WebSocket front end
//!
//! Thin transport layer over the orchestration core: deserializes inbound
//! requests and control frames and forwards them to the core's public
//! operations. The core never depends on transport specifics.

mod routes;
mod ws;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::distributor::EventDistributor;
use crate::error::ScanError;
use crate::persistence::MappingStore;
use crate::registry::SessionRegistry;
use crate::reports::ReportStore;
use crate::supervisor::ScanSupervisor;

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub supervisor: Arc<ScanSupervisor>,
    pub distributor: Arc<EventDistributor>,
    pub reports: Arc<ReportStore>,
    pub mappings: Arc<MappingStore>,
}

/// API error wrapper mapping the core error taxonomy onto HTTP statuses
pub struct ApiError(ScanError);

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ScanError::SessionNotFound(_)
            | ScanError::ReportNotFound(_)
            | ScanError::VulnerabilityNotFound { .. } => StatusCode::NOT_FOUND,
            ScanError::InvalidExportFormat(_) | ScanError::DuplicateSession(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/api/health", get(routes::health))
        .route("/api/scans", post(routes::create_scan).get(routes::list_scans))
        .route("/api/scans/{scan_id}", get(routes::get_scan))
        .route("/api/scans/{scan_id}/stop", post(routes::stop_scan))
        .route("/api/scans/{scan_id}/message", post(routes::send_message))
        .route(
            "/api/scans/{scan_id}/vulnerabilities",
            get(routes::get_vulnerabilities),
        )
        .route(
            "/api/scans/{scan_id}/vulnerabilities/{vuln_id}",
            get(routes::get_vulnerability_report),
        )
        .route("/api/scans/{scan_id}/report", get(routes::get_report))
        .route(
            "/api/scans/{scan_id}/report/export",
            get(routes::export_report),
        )
        .route("/ws/{scan_id}", get(ws::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
