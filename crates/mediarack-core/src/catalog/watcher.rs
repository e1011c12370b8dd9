//! File-level watches over the two catalogue documents.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;

use super::service::CatalogService;

/// Watches both documents and rebuilds the merged view on any change.
///
/// Each change triggers a full reload followed by a `Changed` event on the
/// service's channel. Only notify's own change coalescing applies; rapid
/// successive edits may trigger multiple reloads.
pub struct CatalogWatcher {
    watchers: Vec<RecommendedWatcher>,
    task: JoinHandle<()>,
}

impl CatalogWatcher {
    /// Establish watches for the service's two documents.
    ///
    /// The documents may not exist yet, so the watch is placed on each
    /// parent directory and filtered down to the document file names.
    pub async fn spawn(service: Arc<CatalogService>) -> Result<Self> {
        let (builtin, external) = service.document_paths().await;
        let (tx, mut rx) = mpsc::channel::<()>(16);

        let targets = [builtin, external];
        let names: Vec<OsString> = targets
            .iter()
            .filter_map(|p| p.file_name().map(OsString::from))
            .collect();
        let dirs: BTreeSet<PathBuf> = targets
            .iter()
            .filter_map(|p| p.parent().map(PathBuf::from))
            .collect();

        let mut watchers = Vec::new();
        for dir in dirs {
            let tx = tx.clone();
            let names = names.clone();
            let mut watcher = notify::recommended_watcher(
                move |res: notify::Result<notify::Event>| match res {
                    Ok(event) => {
                        if matches!(event.kind, notify::EventKind::Access(_)) {
                            return;
                        }
                        let hit = event
                            .paths
                            .iter()
                            .filter_map(|p| p.file_name())
                            .any(|n| names.iter().any(|m| m.as_os_str() == n));
                        if hit {
                            let _ = tx.blocking_send(());
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Catalogue watch error");
                    }
                },
            )?;
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            watchers.push(watcher);
        }

        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                tracing::debug!("Catalogue document changed on disk, reloading");
                service.reload().await;
            }
        });

        Ok(Self { watchers, task })
    }

    /// Re-establish the watches, closing the existing ones first.
    pub async fn reestablish(self, service: Arc<CatalogService>) -> Result<Self> {
        self.dispose();
        Self::spawn(service).await
    }

    /// Close the watches and stop the reload task.
    ///
    /// Dropping the watcher has the same effect: closing the watches closes
    /// the channel, which ends the reload task.
    pub fn dispose(self) {
        let Self { watchers, task } = self;
        drop(watchers);
        task.abort();
    }
}
