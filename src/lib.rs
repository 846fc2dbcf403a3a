//! # Strix Dashboard
//!
//! Scan orchestration and event-distribution service for the Strix security
//! scanner. The core supervises long-running scan subprocesses, classifies
//! their unstructured output into typed domain events, maintains per-session
//! state and broadcasts every state change, in order, to all live
//! subscribers of that session.
//!
//! ## Architecture
//!
//! - [`SessionRegistry`] owns all in-memory session state.
//! - [`ScanSupervisor`] spawns one supervising task per session, streams the
//!   worker's merged output through an [`OutputClassifier`] and drives the
//!   distributor on every state change.
//! - [`EventDistributor`] fans events out to the session's subscribers with
//!   best-effort delivery; a broken sink is dropped, never allowed to block
//!   the rest.
//! - [`reconcile_historical`] runs once at startup and synthesizes session
//!   records for run artifacts a prior service instance left on disk.
//! - [`ReportStore`] and [`MappingStore`] are the filesystem collaborators
//!   for report artifacts and the durable id-to-run mapping.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! use strix_dashboard::{
//!     EventDistributor, MappingStore, PatternClassifier, ReportStore, ScanConfig,
//!     ScanSupervisor, SessionRegistry,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = Arc::new(SessionRegistry::new());
//!     let distributor = Arc::new(EventDistributor::new());
//!     let reports = Arc::new(ReportStore::new("strix_runs"));
//!     let mappings = Arc::new(MappingStore::open(std::path::Path::new(".strix_api_data")));
//!
//!     let supervisor = ScanSupervisor::new(
//!         Arc::clone(&registry),
//!         Arc::clone(&distributor),
//!         reports,
//!         mappings,
//!         Arc::new(PatternClassifier),
//!         PathBuf::from("."),
//!         None,
//!     );
//!
//!     let session = registry.create(ScanConfig::default(), None).await?;
//!     supervisor.start(&session.id).await;
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod distributor;
pub mod error;
pub mod persistence;
pub mod reconciler;
pub mod registry;
pub mod reports;
pub mod server;
pub mod supervisor;
pub mod types;

pub use classifier::{DETECTED_VULNERABILITY_TITLE, OutputClassifier, PatternClassifier};
pub use distributor::{EventDistributor, SubscriberId};
pub use error::{Result, ScanError};
pub use persistence::{MappingStore, ScanMapping};
pub use reconciler::reconcile_historical;
pub use registry::SessionRegistry;
pub use reports::{ExportFormat, ExportPayload, ReportStore, VulnerabilityReport};
pub use supervisor::ScanSupervisor;
pub use types::{
    Agent, AgentStatus, ChatMessage, EventType, LiveStats, ScanConfig, ScanEvent, ScanSession,
    ScanStatus, Severity, Target, TargetType, ToolExecution, ToolKind, ToolStatus, Vulnerability,
};

/// Crate version reported by the API banner
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
