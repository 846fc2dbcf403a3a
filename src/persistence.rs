//! Durable scan-id to run-name mapping store
//!
//! A single JSON file (`scan_mapping.json`) holding the association from
//! session id to the worker's artifact directory name plus metadata. Loaded
//! in full at startup and rewritten in full on every update; write failures
//! are logged and tolerated (best-effort durability).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File name of the mapping store inside the data directory
pub const MAPPING_FILE: &str = "scan_mapping.json";

/// One persisted mapping entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMapping {
    /// The worker's artifact directory name
    pub run_name: String,
    /// When the mapping was written
    pub created_at: DateTime<Utc>,
    /// Arbitrary additional metadata
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Store for scan-id to run-name mappings
pub struct MappingStore {
    path: PathBuf,
    mappings: Mutex<HashMap<String, ScanMapping>>,
}

impl MappingStore {
    /// Open (or create) the mapping store under the given data directory
    #[must_use]
    pub fn open(data_dir: &Path) -> Self {
        if let Err(e) = fs::create_dir_all(data_dir) {
            log::error!("Failed to create data dir {}: {e}", data_dir.display());
        }
        let path = data_dir.join(MAPPING_FILE);
        let mappings = Self::load(&path);
        Self {
            path,
            mappings: Mutex::new(mappings),
        }
    }

    fn load(path: &Path) -> HashMap<String, ScanMapping> {
        if !path.exists() {
            log::info!("No existing mappings file at {}", path.display());
            return HashMap::new();
        }
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<HashMap<String, ScanMapping>>(&text) {
                Ok(mappings) => {
                    log::info!("Loaded {} scan mappings from {}", mappings.len(), path.display());
                    mappings
                }
                Err(e) => {
                    log::error!("Error parsing mappings file {}: {e}", path.display());
                    HashMap::new()
                }
            },
            Err(e) => {
                log::error!("Error reading mappings file {}: {e}", path.display());
                HashMap::new()
            }
        }
    }

    fn save_locked(&self, mappings: &HashMap<String, ScanMapping>) {
        match serde_json::to_string_pretty(mappings) {
            Ok(text) => {
                if let Err(e) = fs::write(&self.path, text) {
                    log::error!("Error saving mappings to {}: {e}", self.path.display());
                } else {
                    log::debug!("Saved {} scan mappings to {}", mappings.len(), self.path.display());
                }
            }
            Err(e) => log::error!("Error serializing mappings: {e}"),
        }
    }

    /// Add or update one mapping and rewrite the backing file
    pub fn add(&self, scan_id: &str, run_name: &str, metadata: Option<Map<String, Value>>) {
        let mut mappings = self.mappings.lock();
        mappings.insert(
            scan_id.to_string(),
            ScanMapping {
                run_name: run_name.to_string(),
                created_at: Utc::now(),
                metadata: metadata.unwrap_or_default(),
            },
        );
        self.save_locked(&mappings);
    }

    /// Run name for a scan id
    #[must_use]
    pub fn run_name_for(&self, scan_id: &str) -> Option<String> {
        self.mappings
            .lock()
            .get(scan_id)
            .map(|m| m.run_name.clone())
    }

    /// Reverse lookup: scan id for a run name
    #[must_use]
    pub fn scan_id_for_run(&self, run_name: &str) -> Option<String> {
        self.mappings
            .lock()
            .iter()
            .find(|(_, m)| m.run_name == run_name)
            .map(|(id, _)| id.clone())
    }

    /// Whether any mapping points at the given run name
    #[must_use]
    pub fn contains_run(&self, run_name: &str) -> bool {
        self.mappings
            .lock()
            .values()
            .any(|m| m.run_name == run_name)
    }

    /// Number of stored mappings
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.lock().len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.lock().is_empty()
    }
}
