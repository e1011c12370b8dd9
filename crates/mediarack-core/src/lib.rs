//! Mediarack core - catalogue and launch management for third-party media
//! tools.
//!
//! Two on-disk JSON documents (a read-mostly builtin catalogue and a
//! user-editable external catalogue) are merged into one derived view,
//! watched for external edits, and mutated through origin-routed
//! operations. Resolved entries launch as child processes with per-tool
//! quirks: detached fire-and-forget for the bundled streaming recorder,
//! tracked with output forwarding for everything else.

pub mod catalog;
pub mod error;
pub mod fetch;
pub mod launch;
pub mod paths;
pub mod resolve;
pub mod settings;

pub use catalog::{
    AppEntry, Catalog, CatalogEvent, CatalogService, CatalogStore, CatalogWatcher, Category,
    EntryOrigin,
};
pub use error::{Error, Result};
pub use launch::{AppLauncher, LaunchStrategy, ProcessRegistry};
pub use paths::Paths;
pub use settings::Settings;
