//! Scan process supervision
//!
//! Spawns and monitors one worker subprocess per scan session. Each session
//! gets its own supervising task holding ownership of the child process;
//! `stop` cancels the task and terminates the worker, and the session always
//! reaches a terminal state.

mod command;
mod run;

pub use command::{WORKER_BIN, build_worker_command, resolve_worker};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::classifier::OutputClassifier;
use crate::distributor::EventDistributor;
use crate::persistence::MappingStore;
use crate::registry::SessionRegistry;
use crate::reports::ReportStore;
use crate::types::{ChatMessage, ScanEvent, ScanStatus};

/// Handle to one running supervision task
struct SupervisedTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Everything a supervision task needs, cloned per session
pub(crate) struct RunContext {
    pub registry: Arc<SessionRegistry>,
    pub distributor: Arc<EventDistributor>,
    pub reports: Arc<ReportStore>,
    pub mappings: Arc<MappingStore>,
    pub classifier: Arc<dyn OutputClassifier>,
    pub workdir: PathBuf,
    pub worker_path: Option<PathBuf>,
    pub scan_id: String,
    pub cancel: CancellationToken,
}

/// Supervisor for scan worker subprocesses
///
/// Owns the map from session id to supervision task and exposes the core's
/// public operations: start, stop and user-message delivery. Exactly one
/// supervision task runs per session at a time.
pub struct ScanSupervisor {
    registry: Arc<SessionRegistry>,
    distributor: Arc<EventDistributor>,
    reports: Arc<ReportStore>,
    mappings: Arc<MappingStore>,
    classifier: Arc<dyn OutputClassifier>,
    workdir: PathBuf,
    worker_path: Option<PathBuf>,
    tasks: Arc<Mutex<HashMap<String, SupervisedTask>>>,
}

impl ScanSupervisor {
    /// Create a supervisor
    ///
    /// `worker_path` overrides worker resolution (otherwise the well-known
    /// install path and a system-wide lookup are tried); `workdir` is the
    /// working directory workers are spawned in.
    pub fn new(
        registry: Arc<SessionRegistry>,
        distributor: Arc<EventDistributor>,
        reports: Arc<ReportStore>,
        mappings: Arc<MappingStore>,
        classifier: Arc<dyn OutputClassifier>,
        workdir: PathBuf,
        worker_path: Option<PathBuf>,
    ) -> Self {
        Self {
            registry,
            distributor,
            reports,
            mappings,
            classifier,
            workdir,
            worker_path,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Begin asynchronous supervision of a session
    ///
    /// Returns immediately. A no-op if the session id is unknown or the
    /// session is already supervised.
    pub async fn start(&self, scan_id: &str) {
        if !self.registry.contains(scan_id).await {
            log::warn!("start requested for unknown scan {scan_id}");
            return;
        }

        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(scan_id) {
            log::warn!("scan {scan_id} is already supervised");
            return;
        }

        let cancel = CancellationToken::new();
        let ctx = RunContext {
            registry: Arc::clone(&self.registry),
            distributor: Arc::clone(&self.distributor),
            reports: Arc::clone(&self.reports),
            mappings: Arc::clone(&self.mappings),
            classifier: Arc::clone(&self.classifier),
            workdir: self.workdir.clone(),
            worker_path: self.worker_path.clone(),
            scan_id: scan_id.to_string(),
            cancel: cancel.clone(),
        };

        let task_map = Arc::clone(&self.tasks);
        let id = scan_id.to_string();
        let handle = tokio::spawn(async move {
            run::run_scan(ctx).await;
            task_map.lock().await.remove(&id);
        });

        tasks.insert(scan_id.to_string(), SupervisedTask { cancel, handle });
    }

    /// Request cancellation of a session
    ///
    /// Signals the worker process (if alive) through the supervising task and
    /// transitions the session to `stopped` with a completion timestamp.
    /// Idempotent: repeat calls only re-apply the state write. Returns false
    /// if the session id is unknown.
    pub async fn stop(&self, scan_id: &str) -> bool {
        if let Some(task) = self.tasks.lock().await.remove(scan_id) {
            task.cancel.cancel();
        }

        let now = Utc::now();
        self.registry
            .update(scan_id, |s| {
                s.status = ScanStatus::Stopped;
                if s.completed_at.is_none() {
                    s.completed_at = Some(now);
                }
            })
            .await
            .is_some()
    }

    /// Append a user chat message to a session and broadcast it
    ///
    /// The message is recorded and fanned out to subscribers; it is not
    /// forwarded into the worker's input channel. Returns false if the
    /// session id is unknown.
    pub async fn send_user_message(&self, scan_id: &str, content: &str) -> bool {
        if !self.registry.contains(scan_id).await {
            return false;
        }

        let message_id = self.registry.next_message_id(scan_id).await;
        let message = ChatMessage {
            id: message_id,
            content: content.to_string(),
            role: "user".to_string(),
            agent_id: None,
            timestamp: Utc::now(),
        };
        self.registry
            .update(scan_id, |s| s.chat_messages.push(message))
            .await;
        self.distributor.publish(
            scan_id,
            ScanEvent::chat_message(message_id, content, "user", None),
        );
        true
    }

    /// Stop every supervised session; called on service shutdown
    pub async fn shutdown(&self) {
        let ids: Vec<String> = self.tasks.lock().await.keys().cloned().collect();
        for scan_id in ids {
            log::debug!("stopping scan {scan_id} for shutdown");
            self.stop(&scan_id).await;
        }
    }

    /// Whether a session currently has a live supervision task
    pub async fn is_supervised(&self, scan_id: &str) -> bool {
        self.tasks.lock().await.contains_key(scan_id)
    }

    /// Wait for a session's supervision task to finish, if one is running.
    /// Intended for tests and orderly shutdown.
    pub async fn join(&self, scan_id: &str) {
        let handle = self.tasks.lock().await.remove(scan_id);
        if let Some(task) = handle {
            let _ = task.handle.await;
        }
    }
}
