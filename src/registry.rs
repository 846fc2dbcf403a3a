//! Session registry owning all in-memory scan state
//!
//! The registry is explicitly owned state passed by handle to every component
//! that needs it; there are no ambient singletons. All mutation of a given
//! session's fields goes through [`SessionRegistry::update`] and is performed
//! only by that session's supervising task, so no per-session lock is needed.

use std::collections::HashMap;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Result, ScanError};
use crate::types::{ScanConfig, ScanSession};

/// Per-session monotonic id counters
#[derive(Debug)]
struct SessionCounters {
    next_execution_id: u64,
    next_message_id: u64,
}

impl Default for SessionCounters {
    fn default() -> Self {
        Self {
            next_execution_id: 1,
            next_message_id: 1,
        }
    }
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, ScanSession>,
    counters: HashMap<String, SessionCounters>,
}

/// Registry mapping session id to session state
///
/// Exposes create/get/list plus closure-based updates; enforces id
/// uniqueness. Snapshots returned from `get`/`list` are clones, so callers
/// never observe a session mid-mutation.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<Inner>,
}

impl SessionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh scan id (`scan-` plus 8 hex chars)
    #[must_use]
    pub fn generate_id() -> String {
        format!("scan-{}", &Uuid::new_v4().simple().to_string()[..8])
    }

    /// Create a new pending session
    ///
    /// The id is the caller-supplied name when given, otherwise generated.
    ///
    /// # Errors
    /// Returns [`ScanError::DuplicateSession`] if the id is already in use.
    pub async fn create(&self, config: ScanConfig, name: Option<String>) -> Result<ScanSession> {
        let scan_id = name.clone().unwrap_or_else(Self::generate_id);

        let mut inner = self.inner.lock().await;
        if inner.sessions.contains_key(&scan_id) {
            return Err(ScanError::DuplicateSession(scan_id));
        }

        let session = ScanSession::new(scan_id.clone(), name, config);
        inner.sessions.insert(scan_id.clone(), session.clone());
        inner.counters.insert(scan_id, SessionCounters::default());
        Ok(session)
    }

    /// Insert a session synthesized by the historical reconciler
    ///
    /// Returns false (and leaves the registry untouched) if the id is
    /// already tracked; the reconciler never overwrites live state.
    pub async fn insert_historical(&self, session: ScanSession) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.sessions.contains_key(&session.id) {
            return false;
        }
        inner
            .counters
            .insert(session.id.clone(), SessionCounters::default());
        inner.sessions.insert(session.id.clone(), session);
        true
    }

    /// Get a snapshot of one session
    pub async fn get(&self, scan_id: &str) -> Option<ScanSession> {
        self.inner.lock().await.sessions.get(scan_id).cloned()
    }

    /// Whether a session id is tracked
    pub async fn contains(&self, scan_id: &str) -> bool {
        self.inner.lock().await.sessions.contains_key(scan_id)
    }

    /// Snapshot of all sessions, most recently started first
    pub async fn list(&self) -> Vec<ScanSession> {
        let inner = self.inner.lock().await;
        let mut sessions: Vec<ScanSession> = inner.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions
    }

    /// Apply a mutation to one session, returning the closure result
    ///
    /// Returns None if the session id is unknown.
    pub async fn update<F, R>(&self, scan_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut ScanSession) -> R,
    {
        let mut inner = self.inner.lock().await;
        inner.sessions.get_mut(scan_id).map(f)
    }

    /// Run a closure against one session's current state under the registry
    /// lock
    ///
    /// Because every state write goes through [`update`](Self::update) and so
    /// contends on the same lock, a side effect performed inside the closure
    /// (such as registering an event sink) is ordered against all session
    /// mutations: nothing can change between the read and the side effect.
    /// The closure must not block.
    pub async fn with_session<F, R>(&self, scan_id: &str, f: F) -> R
    where
        F: FnOnce(Option<&ScanSession>) -> R,
    {
        let inner = self.inner.lock().await;
        f(inner.sessions.get(scan_id))
    }

    /// Allocate the next tool-execution id for a session
    ///
    /// Ids are strictly increasing by 1 starting at 1, with no gaps or
    /// repeats within a session.
    pub async fn next_execution_id(&self, scan_id: &str) -> u64 {
        let mut inner = self.inner.lock().await;
        let counters = inner.counters.entry(scan_id.to_string()).or_default();
        let id = counters.next_execution_id;
        counters.next_execution_id += 1;
        id
    }

    /// Allocate the next chat-message id for a session
    pub async fn next_message_id(&self, scan_id: &str) -> u64 {
        let mut inner = self.inner.lock().await;
        let counters = inner.counters.entry(scan_id.to_string()).or_default();
        let id = counters.next_message_id;
        counters.next_message_id += 1;
        id
    }
}
