//! Single-slot manual-run trigger.
//!
//! At most one manual run is ever pending. Requests while one is pending are
//! merged into it. The flag is persisted so a pending request survives a
//! restart.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct TriggerState {
    #[serde(default)]
    declare_manual_run: bool,
}

/// Manual-run flag shared by the chat listener and the orchestrator.
#[derive(Debug, Default)]
pub struct ManualTrigger {
    pending: AtomicBool,
    notify: Notify,
    state_path: Option<PathBuf>,
    /// Held across a flag change and its write so the file matches memory
    write_lock: Mutex<()>,
}

impl ManualTrigger {
    /// A trigger that is not persisted.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Restore the trigger from `state_path`; missing or corrupt state means
    /// nothing is pending.
    pub async fn load(state_path: impl Into<PathBuf>) -> Self {
        let state_path = state_path.into();

        let pending = match tokio::fs::read_to_string(&state_path).await {
            Ok(raw) => match serde_json::from_str::<TriggerState>(&raw) {
                Ok(state) => state.declare_manual_run,
                Err(e) => {
                    warn!(path = %state_path.display(), "Corrupt trigger state, ignoring: {}", e);
                    false
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %state_path.display(), "Failed to read trigger state: {}", e);
                false
            }
        };

        if pending {
            debug!(path = %state_path.display(), "Restored pending manual run");
        }

        Self {
            pending: AtomicBool::new(pending),
            notify: Notify::new(),
            state_path: Some(state_path),
            write_lock: Mutex::new(()),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Request a manual run.
    ///
    /// Returns `false` when one was already pending.
    pub async fn request(&self) -> bool {
        let newly_set = {
            let _guard = self.write_lock.lock().await;
            let newly_set = !self.pending.swap(true, Ordering::SeqCst);
            if newly_set {
                self.persist(true).await;
            }
            newly_set
        };
        self.notify.notify_one();
        newly_set
    }

    /// Consume the pending request, if any.
    pub async fn take(&self) -> bool {
        let _guard = self.write_lock.lock().await;
        let was_pending = self.pending.swap(false, Ordering::SeqCst);
        if was_pending {
            self.persist(false).await;
        }
        was_pending
    }

    /// Wait until a request is pending.
    ///
    /// May also return spuriously after a request was already taken; callers
    /// re-check with [`take`](Self::take).
    pub async fn wait(&self) {
        if self.is_pending() {
            return;
        }
        self.notify.notified().await;
    }

    async fn persist(&self, pending: bool) {
        let Some(path) = &self.state_path else {
            return;
        };

        let state = TriggerState {
            declare_manual_run: pending,
        };
        let result = match serde_json::to_string(&state) {
            Ok(json) => tokio::fs::write(path, json).await,
            Err(e) => Err(std::io::Error::other(e)),
        };
        if let Err(e) = result {
            warn!(path = %path.display(), "Failed to persist trigger state: {}", e);
        }
    }
}
