//! Dedup ledger of published clip ids.
//!
//! Stored as a JSON array of ids. The ledger only grows; an id is added once
//! its clip has been published.

use std::collections::HashSet;
use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, warn};

use clipcast_models::ClipId;

use crate::error::{WorkerError, WorkerResult};

/// Set of published clip ids backed by a JSON file.
#[derive(Debug, Clone)]
pub struct DedupLedger {
    path: PathBuf,
    /// Insertion order, as written to disk
    order: Vec<ClipId>,
    ids: HashSet<ClipId>,
}

impl DedupLedger {
    /// An empty ledger that will be saved to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            order: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Load the ledger at `path`.
    ///
    /// A missing file is an empty ledger. An unreadable or corrupt file is
    /// also treated as empty, with a warning.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let mut ledger = Self::empty(path);

        let raw = match fs::read_to_string(&ledger.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %ledger.path.display(), "No ledger yet, starting empty");
                return ledger;
            }
            Err(e) => {
                warn!(path = %ledger.path.display(), "Failed to read ledger, treating as empty: {}", e);
                return ledger;
            }
        };

        match serde_json::from_str::<Vec<ClipId>>(&raw) {
            Ok(ids) => {
                for id in ids {
                    ledger.insert(id);
                }
                debug!(path = %ledger.path.display(), entries = ledger.len(), "Loaded ledger");
            }
            Err(e) => {
                warn!(path = %ledger.path.display(), "Corrupt ledger, treating as empty: {}", e);
            }
        }

        ledger
    }

    pub fn contains(&self, id: &ClipId) -> bool {
        self.ids.contains(id)
    }

    /// Add an id; returns `false` if it was already present.
    pub fn insert(&mut self, id: ClipId) -> bool {
        if !self.ids.insert(id.clone()) {
            return false;
        }
        self.order.push(id);
        true
    }

    pub fn ids(&self) -> &HashSet<ClipId> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Write the ledger, replacing the file atomically.
    pub async fn save(&self) -> WorkerResult<()> {
        let json = serde_json::to_string(&self.order)
            .map_err(|e| WorkerError::ledger(format!("failed to serialize ledger: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| WorkerError::ledger(format!("failed to create {}: {}", parent.display(), e)))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|e| WorkerError::ledger(format!("failed to write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| WorkerError::ledger(format!("failed to replace {}: {}", self.path.display(), e)))?;

        debug!(path = %self.path.display(), entries = self.len(), "Saved ledger");
        Ok(())
    }
}
