//! The running-process table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::oneshot;

/// Record for one tracked process.
#[derive(Debug)]
struct ProcessHandle {
    pid: Option<u32>,
    token: u64,
    kill: Option<oneshot::Sender<()>>,
}

/// Running applications keyed by application name.
///
/// At most one record per name. Inserting under an existing name replaces
/// the old record without signalling the process it pointed at; the
/// replaced process keeps running untracked.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    apps: Mutex<HashMap<String, ProcessHandle>>,
    next_token: AtomicU64,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly spawned process. The returned generation token must
    /// be presented by the monitor task to deregister this exact record.
    pub fn insert(&self, name: &str, pid: Option<u32>, kill: oneshot::Sender<()>) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let mut apps = self.apps.lock().unwrap();
        apps.insert(
            name.to_string(),
            ProcessHandle {
                pid,
                token,
                kill: Some(kill),
            },
        );
        token
    }

    /// Drop the record for `name` if it still belongs to `token`.
    ///
    /// A record replaced by a relaunch carries a newer token, so a stale
    /// monitor observing its process exit cannot evict the replacement.
    pub fn deregister(&self, name: &str, token: u64) {
        let mut apps = self.apps.lock().unwrap();
        if apps.get(name).map(|h| h.token) == Some(token) {
            apps.remove(name);
        }
    }

    /// Request termination of the tracked process and forget it.
    ///
    /// Termination is requested, not verified; there is no forced-kill
    /// escalation. No-op for unknown names.
    pub fn stop(&self, name: &str) {
        let handle = self.apps.lock().unwrap().remove(name);
        if let Some(mut handle) = handle {
            tracing::info!(app = name, pid = ?handle.pid, "Stopping application");
            if let Some(kill) = handle.kill.take() {
                let _ = kill.send(());
            }
        }
    }

    /// Stop every tracked application.
    pub fn stop_all(&self) {
        let names: Vec<String> = self.apps.lock().unwrap().keys().cloned().collect();
        for name in names {
            self.stop(&name);
        }
    }

    pub fn pid(&self, name: &str) -> Option<u32> {
        self.apps.lock().unwrap().get(name).and_then(|h| h.pid)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.apps.lock().unwrap().contains_key(name)
    }

    pub fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self.apps.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.apps.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.lock().unwrap().is_empty()
    }
}
