//! Shared catalogue service: one merged view, broadcast change events.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use crate::error::Result;

use super::model::{AppEntry, Catalog, Category};
use super::store::CatalogStore;

/// Published whenever the merged view is rebuilt.
#[derive(Debug, Clone)]
pub enum CatalogEvent {
    /// A full load completed.
    Loaded(Catalog),
    /// The merged view changed after a mutation or an external edit.
    Changed(Catalog),
}

/// Serializes access to the store and fans change events out to
/// subscribers (watcher, UI bridge, resident CLI mode).
pub struct CatalogService {
    store: Mutex<CatalogStore>,
    events: broadcast::Sender<CatalogEvent>,
}

impl CatalogService {
    pub fn new(builtin_path: PathBuf, external_path: PathBuf) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            store: Mutex::new(CatalogStore::new(builtin_path, external_path)),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }

    /// Rebuild the merged view from disk and announce the load.
    pub async fn load(&self) -> Catalog {
        let mut store = self.store.lock().await;
        let merged = store.load().clone();
        let _ = self.events.send(CatalogEvent::Loaded(merged.clone()));
        merged
    }

    /// Rebuild after an external edit and announce the change.
    pub async fn reload(&self) -> Catalog {
        let mut store = self.store.lock().await;
        let merged = store.load().clone();
        let _ = self.events.send(CatalogEvent::Changed(merged.clone()));
        merged
    }

    /// The current merged view.
    pub async fn config(&self) -> Catalog {
        self.store.lock().await.merged().clone()
    }

    pub async fn category(&self, id: &str) -> Option<Category> {
        self.store.lock().await.merged().category(id).cloned()
    }

    pub async fn app(&self, category_id: &str, name: &str) -> Option<AppEntry> {
        self.store.lock().await.merged().app(category_id, name).cloned()
    }

    pub async fn add_app(&self, entry: AppEntry) -> Result<AppEntry> {
        let mut store = self.store.lock().await;
        let entry = store.add_app(entry)?;
        let _ = self
            .events
            .send(CatalogEvent::Changed(store.merged().clone()));
        Ok(entry)
    }

    pub async fn update_app(&self, entry: AppEntry) -> Result<()> {
        let mut store = self.store.lock().await;
        store.update_app(entry)?;
        let _ = self
            .events
            .send(CatalogEvent::Changed(store.merged().clone()));
        Ok(())
    }

    pub async fn delete_app(&self, category_id: &str, app_id: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        store.delete_app(category_id, app_id)?;
        let _ = self
            .events
            .send(CatalogEvent::Changed(store.merged().clone()));
        Ok(())
    }

    pub async fn add_category(&self, id: &str, name: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        store.add_category(id, name)?;
        let _ = self
            .events
            .send(CatalogEvent::Changed(store.merged().clone()));
        Ok(())
    }

    pub async fn update_category(&self, id: &str, name: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        store.update_category(id, name)?;
        let _ = self
            .events
            .send(CatalogEvent::Changed(store.merged().clone()));
        Ok(())
    }

    pub async fn delete_category(&self, id: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        store.delete_category(id)?;
        let _ = self
            .events
            .send(CatalogEvent::Changed(store.merged().clone()));
        Ok(())
    }

    pub async fn import(&self, doc: serde_json::Value) -> Result<()> {
        let mut store = self.store.lock().await;
        store.import(doc)?;
        let _ = self
            .events
            .send(CatalogEvent::Changed(store.merged().clone()));
        Ok(())
    }

    /// Paths of the two documents, for establishing watches.
    pub async fn document_paths(&self) -> (PathBuf, PathBuf) {
        let store = self.store.lock().await;
        (
            store.builtin_path().to_path_buf(),
            store.external_path().to_path_buf(),
        )
    }
}
