// Strix Dashboard server
//
// Reconciles prior run artifacts, then serves the scan orchestration API
// and the per-session live event stream over HTTP/WebSocket.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use strix_dashboard::server::{self, AppState};
use strix_dashboard::{
    EventDistributor, MappingStore, PatternClassifier, ReportStore, ScanSupervisor,
    SessionRegistry, reconcile_historical,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let runs_dir =
        PathBuf::from(env::var("STRIX_RUNS_DIR").unwrap_or_else(|_| "strix_runs".to_string()));
    let data_dir =
        PathBuf::from(env::var("STRIX_DATA_DIR").unwrap_or_else(|_| ".strix_api_data".to_string()));
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let workdir = env::current_dir()?;

    let registry = Arc::new(SessionRegistry::new());
    let distributor = Arc::new(EventDistributor::new());
    let reports = Arc::new(ReportStore::new(runs_dir));
    let mappings = Arc::new(MappingStore::open(&data_dir));

    // Historical reconciliation runs once, before any session can be created.
    let discovered = reconcile_historical(&registry, &reports, &mappings).await?;
    log::info!("Reconciled {discovered} historical scan(s)");

    let supervisor = Arc::new(ScanSupervisor::new(
        Arc::clone(&registry),
        Arc::clone(&distributor),
        Arc::clone(&reports),
        Arc::clone(&mappings),
        Arc::new(PatternClassifier),
        workdir,
        None,
    ));

    let state = AppState {
        registry,
        supervisor: Arc::clone(&supervisor),
        distributor,
        reports,
        mappings,
    };
    let app = server::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Strix Dashboard listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(supervisor))
        .await?;
    Ok(())
}

async fn shutdown_signal(supervisor: Arc<ScanSupervisor>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        return;
    }
    log::info!("Shutdown requested, stopping active scans");
    supervisor.shutdown().await;
}
