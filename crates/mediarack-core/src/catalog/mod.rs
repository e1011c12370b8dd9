//! Catalogue: data model, two-document merge, persistence, events, watch.

pub mod merge;
pub mod model;
mod service;
mod store;
mod watcher;

pub use model::{AppEntry, Catalog, Category, EntryOrigin};
pub use service::{CatalogEvent, CatalogService};
pub use store::CatalogStore;
pub use watcher::CatalogWatcher;
