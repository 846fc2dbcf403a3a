//! Error types for the scan orchestration service

use thiserror::Error;

/// Main error type for scan orchestration operations
#[derive(Error, Debug)]
pub enum ScanError {
    /// Strix CLI not found or not installed
    #[error("{0}")]
    WorkerNotFound(String),

    /// Scan session not found
    #[error("Scan not found: {0}")]
    SessionNotFound(String),

    /// A session with this id already exists
    #[error("Scan id already in use: {0}")]
    DuplicateSession(String),

    /// Report artifact missing for a run
    #[error("Report not found for run: {0}")]
    ReportNotFound(String),

    /// Per-vulnerability report artifact missing
    #[error("Vulnerability {vuln_id} not found in run {run_name}")]
    VulnerabilityNotFound {
        /// Run directory name
        run_name: String,
        /// Vulnerability identifier (e.g. "vuln-0001")
        vuln_id: String,
    },

    /// Unrecognized export format requested
    #[error("Unsupported export format: {0}")]
    InvalidExportFormat(String),

    /// Report export failure (rendering or encoding)
    #[error("Export error: {0}")]
    Export(String),

    /// JSON decode error
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for scan orchestration operations
pub type Result<T> = std::result::Result<T, ScanError>;

impl ScanError {
    /// Create a worker-not-found error with install instructions
    #[must_use]
    pub fn worker_not_found() -> Self {
        Self::WorkerNotFound(
            "Strix CLI not found. Please install via: pipx install strix-agent".to_string(),
        )
    }

    /// Create a session not found error
    pub fn session_not_found(scan_id: impl Into<String>) -> Self {
        Self::SessionNotFound(scan_id.into())
    }

    /// Create a report not found error
    pub fn report_not_found(run_name: impl Into<String>) -> Self {
        Self::ReportNotFound(run_name.into())
    }

    /// Create a vulnerability not found error
    pub fn vulnerability_not_found(
        run_name: impl Into<String>,
        vuln_id: impl Into<String>,
    ) -> Self {
        Self::VulnerabilityNotFound {
            run_name: run_name.into(),
            vuln_id: vuln_id.into(),
        }
    }

    /// Create an export error
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }
}
