//! Catalogue persistence and mutation over the two on-disk documents.
//!
//! The builtin and external documents are the sole durable source of truth;
//! the merged view held here is always derived, rebuilt wholesale by
//! [`CatalogStore::load`]. Every mutation re-reads the owning document from
//! disk immediately before changing it so concurrent external edits are not
//! clobbered, validates its invariants before any write, then writes back
//! and rebuilds the merged view.

use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::merge::merge;
use super::model::{AppEntry, Catalog, Category, EntryOrigin};

/// Owns the two document paths and the merged view derived from them.
pub struct CatalogStore {
    builtin_path: PathBuf,
    external_path: PathBuf,
    merged: Catalog,
}

impl CatalogStore {
    pub fn new(builtin_path: PathBuf, external_path: PathBuf) -> Self {
        Self {
            builtin_path,
            external_path,
            merged: Catalog::default(),
        }
    }

    pub fn builtin_path(&self) -> &Path {
        &self.builtin_path
    }

    pub fn external_path(&self) -> &Path {
        &self.external_path
    }

    /// Rebuild the merged view from both documents.
    ///
    /// A missing document is an empty document. A document that fails to
    /// parse is also treated as empty (and logged) so one malformed file
    /// cannot take the whole catalogue down.
    pub fn load(&mut self) -> &Catalog {
        let builtin = read_document_lenient(&self.builtin_path);
        let external = read_document_lenient(&self.external_path);
        self.merged = merge(&builtin, &external);
        &self.merged
    }

    /// The current merged view.
    pub fn merged(&self) -> &Catalog {
        &self.merged
    }

    /// Overwrite the builtin document. Write failures surface to the caller.
    pub fn save_builtin(&self, doc: &Catalog) -> Result<()> {
        write_document(&self.builtin_path, doc)
    }

    /// Overwrite the external document. Write failures surface to the caller.
    pub fn save_external(&self, doc: &Catalog) -> Result<()> {
        write_document(&self.external_path, doc)
    }

    /// Add an application to the external document.
    ///
    /// Only external entries may be added here. The target category is
    /// located (or created, with its name copied from the merged view)
    /// inside the external document. Name uniqueness is checked against the
    /// merged view, so a builtin entry with the same name also rejects the
    /// add. A fresh id is assigned before insertion; the entry is returned
    /// with that id.
    pub fn add_app(&mut self, mut entry: AppEntry) -> Result<AppEntry> {
        if entry.origin != EntryOrigin::External {
            return Err(Error::InvalidOrigin {
                origin: entry.origin.name(),
            });
        }

        let mut external = read_document(&self.external_path)?;

        if external.category(&entry.category).is_none() {
            let template = self.merged.category(&entry.category).ok_or_else(|| {
                Error::CategoryNotFound {
                    id: entry.category.clone(),
                }
            })?;
            external.categories.push(Category {
                id: template.id.clone(),
                name: template.name.clone(),
                apps: Vec::new(),
            });
        }

        if let Some(existing) = self.merged.category(&entry.category) {
            if existing.apps.iter().any(|a| a.name == entry.name) {
                return Err(Error::DuplicateName {
                    name: entry.name,
                    category: entry.category,
                });
            }
        }

        entry.id = generate_entry_id(&entry.category);
        if let Some(category) = external.category_mut(&entry.category) {
            category.apps.push(entry.clone());
        }

        self.save_external(&external)?;
        self.load();
        Ok(entry)
    }

    /// Rewrite an entry, found by id, inside its owning document.
    pub fn update_app(&mut self, entry: AppEntry) -> Result<()> {
        let path = self.document_path(entry.origin).to_path_buf();
        let mut doc = read_document(&path)?;

        let category = doc.category_mut(&entry.category).ok_or_else(|| {
            Error::CategoryNotFound {
                id: entry.category.clone(),
            }
        })?;
        let slot = category
            .apps
            .iter_mut()
            .find(|a| a.id == entry.id)
            .ok_or_else(|| Error::ApplicationNotFound {
                id: entry.id.clone(),
                category: entry.category.clone(),
            })?;
        *slot = entry;

        write_document(&path, &doc)?;
        self.load();
        Ok(())
    }

    /// Remove an entry; its origin is determined from the merged view.
    pub fn delete_app(&mut self, category_id: &str, app_id: &str) -> Result<()> {
        let category = self
            .merged
            .category(category_id)
            .ok_or_else(|| Error::CategoryNotFound {
                id: category_id.to_string(),
            })?;
        let origin = category
            .apps
            .iter()
            .find(|a| a.id == app_id)
            .map(|a| a.origin)
            .ok_or_else(|| Error::ApplicationNotFound {
                id: app_id.to_string(),
                category: category_id.to_string(),
            })?;

        let path = self.document_path(origin).to_path_buf();
        let mut doc = read_document(&path)?;

        let category = doc.category_mut(category_id).ok_or_else(|| {
            Error::CategoryNotFound {
                id: category_id.to_string(),
            }
        })?;
        let index = category
            .apps
            .iter()
            .position(|a| a.id == app_id)
            .ok_or_else(|| Error::ApplicationNotFound {
                id: app_id.to_string(),
                category: category_id.to_string(),
            })?;
        category.apps.remove(index);

        write_document(&path, &doc)?;
        self.load();
        Ok(())
    }

    /// Insert an empty category into both documents so future builtin and
    /// external entries can both target it.
    pub fn add_category(&mut self, id: &str, name: &str) -> Result<()> {
        let mut builtin = read_document(&self.builtin_path)?;
        let mut external = read_document(&self.external_path)?;

        if builtin.category(id).is_some() || external.category(id).is_some() {
            return Err(Error::DuplicateCategory { id: id.to_string() });
        }

        let empty = Category {
            id: id.to_string(),
            name: name.to_string(),
            apps: Vec::new(),
        };
        builtin.categories.push(empty.clone());
        external.categories.push(empty);

        self.save_builtin(&builtin)?;
        self.save_external(&external)?;
        self.load();
        Ok(())
    }

    /// Rename a category wherever it appears; a document lacking the id is
    /// left untouched.
    pub fn update_category(&mut self, id: &str, name: &str) -> Result<()> {
        for path in [self.builtin_path.clone(), self.external_path.clone()] {
            let mut doc = read_document(&path)?;
            let mut renamed = false;
            if let Some(category) = doc.category_mut(id) {
                category.name = name.to_string();
                renamed = true;
            }
            if renamed {
                write_document(&path, &doc)?;
            }
        }
        self.load();
        Ok(())
    }

    /// Delete a category from both documents. Refused while the merged view
    /// still shows applications under it.
    pub fn delete_category(&mut self, id: &str) -> Result<()> {
        if let Some(category) = self.merged.category(id) {
            if !category.apps.is_empty() {
                return Err(Error::CategoryNotEmpty { id: id.to_string() });
            }
        }

        for path in [self.builtin_path.clone(), self.external_path.clone()] {
            let mut doc = read_document(&path)?;
            let before = doc.categories.len();
            doc.categories.retain(|c| c.id != id);
            if doc.categories.len() != before {
                write_document(&path, &doc)?;
            }
        }
        self.load();
        Ok(())
    }

    /// Replace the entire external document. The builtin document is
    /// untouched.
    pub fn import(&mut self, doc: serde_json::Value) -> Result<()> {
        if !matches!(doc.get("categories"), Some(serde_json::Value::Array(_))) {
            return Err(Error::InvalidFormat);
        }
        let catalog: Catalog =
            serde_json::from_value(doc).map_err(|_| Error::InvalidFormat)?;

        self.save_external(&catalog)?;
        self.load();
        Ok(())
    }

    fn document_path(&self, origin: EntryOrigin) -> &Path {
        match origin {
            EntryOrigin::Builtin => &self.builtin_path,
            EntryOrigin::External => &self.external_path,
        }
    }
}

/// Fresh entry id: category, millisecond timestamp, random suffix.
fn generate_entry_id(category: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        category,
        Utc::now().timestamp_millis(),
        &suffix[..9]
    )
}

/// Strict read used by mutations: a missing document is empty, but a
/// malformed one is a typed failure so no write can corrupt state.
fn read_document(path: &Path) -> Result<Catalog> {
    if !path.exists() {
        return Ok(Catalog::default());
    }
    let raw = std::fs::read_to_string(path)?;
    let clean = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
    Ok(serde_json::from_str(clean)?)
}

/// Lenient read used by `load`: a malformed document degrades to empty.
fn read_document_lenient(path: &Path) -> Catalog {
    match read_document(path) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "Malformed catalogue document, treating as empty"
            );
            Catalog::default()
        }
    }
}

fn write_document(path: &Path, doc: &Catalog) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(doc)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, name: &str, category: &str, origin: EntryOrigin) -> AppEntry {
        AppEntry {
            id: id.to_string(),
            name: name.to_string(),
            path: format!("/opt/{name}"),
            icon: String::new(),
            icon_path: None,
            params: None,
            category: category.to_string(),
            description: String::new(),
            website: None,
            origin,
            download_url: None,
            is_downloaded: None,
            working_directory: None,
        }
    }

    fn seeded_store(dir: &Path) -> CatalogStore {
        let builtin = Catalog {
            categories: vec![Category {
                id: "video".to_string(),
                name: "Video".to_string(),
                apps: vec![entry("b1", "recorder", "video", EntryOrigin::Builtin)],
            }],
            builtin_apps_folder: Some("./apps".to_string()),
        };
        let external = Catalog {
            categories: vec![Category {
                id: "video".to_string(),
                name: "Video".to_string(),
                apps: vec![entry("e1", "mixer", "video", EntryOrigin::External)],
            }],
            builtin_apps_folder: None,
        };

        let builtin_path = dir.join("builtin-apps.json");
        let external_path = dir.join("external-apps.json");
        write_document(&builtin_path, &builtin).unwrap();
        write_document(&external_path, &external).unwrap();

        let mut store = CatalogStore::new(builtin_path, external_path);
        store.load();
        store
    }

    #[test]
    fn load_merges_both_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());

        let merged = store.merged();
        assert_eq!(merged.categories.len(), 1);
        assert_eq!(merged.category("video").unwrap().apps.len(), 2);
        assert_eq!(merged.builtin_apps_folder.as_deref(), Some("./apps"));
    }

    #[test]
    fn missing_documents_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CatalogStore::new(
            dir.path().join("builtin-apps.json"),
            dir.path().join("external-apps.json"),
        );
        store.load();
        assert!(store.merged().categories.is_empty());
    }

    #[test]
    fn leading_bom_is_stripped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let builtin_path = dir.path().join("builtin-apps.json");
        std::fs::write(
            &builtin_path,
            "\u{feff}{\"categories\":[{\"id\":\"video\",\"name\":\"Video\",\"apps\":[]}]}",
        )
        .unwrap();

        let mut store =
            CatalogStore::new(builtin_path, dir.path().join("external-apps.json"));
        store.load();
        assert!(store.merged().category("video").is_some());
    }

    #[test]
    fn malformed_document_degrades_to_empty_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        std::fs::write(store.external_path(), "{not json").unwrap();

        let mut store = store;
        store.load();
        // Builtin half stays usable.
        let apps = &store.merged().category("video").unwrap().apps;
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].id, "b1");
    }

    #[test]
    fn add_app_assigns_a_fresh_id_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded_store(dir.path());

        let added = store
            .add_app(entry("ignored", "encoder", "video", EntryOrigin::External))
            .unwrap();
        assert!(added.id.starts_with("video_"));
        assert_ne!(added.id, "ignored");

        let on_disk = read_document(store.external_path()).unwrap();
        assert!(on_disk
            .category("video")
            .unwrap()
            .apps
            .iter()
            .any(|a| a.id == added.id));
        assert!(store.merged().app("video", "encoder").is_some());
    }

    #[test]
    fn add_app_rejects_builtin_origin_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded_store(dir.path());
        let before = std::fs::read_to_string(store.external_path()).unwrap();

        let err = store
            .add_app(entry("x", "encoder", "video", EntryOrigin::Builtin))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOrigin { origin: "builtin" }));

        let after = std::fs::read_to_string(store.external_path()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn add_app_rejects_duplicate_names_across_origins() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded_store(dir.path());
        let before = std::fs::read_to_string(store.external_path()).unwrap();

        // "recorder" exists in the builtin document; the merged view rejects it.
        let err = store
            .add_app(entry("x", "recorder", "video", EntryOrigin::External))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName { .. }));

        let after = std::fs::read_to_string(store.external_path()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn add_app_requires_a_known_category() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded_store(dir.path());

        let err = store
            .add_app(entry("x", "encoder", "missing", EntryOrigin::External))
            .unwrap_err();
        assert!(matches!(err, Error::CategoryNotFound { .. }));
    }

    #[test]
    fn add_app_copies_the_category_from_the_merged_view() {
        let dir = tempfile::tempdir().unwrap();
        let builtin = Catalog {
            categories: vec![Category {
                id: "audio".to_string(),
                name: "Audio".to_string(),
                apps: Vec::new(),
            }],
            builtin_apps_folder: None,
        };
        let builtin_path = dir.path().join("builtin-apps.json");
        let external_path = dir.path().join("external-apps.json");
        write_document(&builtin_path, &builtin).unwrap();

        let mut store = CatalogStore::new(builtin_path, external_path);
        store.load();
        store
            .add_app(entry("x", "mixer", "audio", EntryOrigin::External))
            .unwrap();

        let external = read_document(store.external_path()).unwrap();
        let category = external.category("audio").unwrap();
        assert_eq!(category.name, "Audio");
        assert_eq!(category.apps.len(), 1);
    }

    #[test]
    fn update_app_is_routed_by_origin() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded_store(dir.path());

        let mut updated = entry("b1", "recorder", "video", EntryOrigin::Builtin);
        updated.path = "/opt/recorder-v2".to_string();
        store.update_app(updated).unwrap();

        let builtin = read_document(store.builtin_path()).unwrap();
        assert_eq!(
            builtin.app_by_id("video", "b1").unwrap().path,
            "/opt/recorder-v2"
        );
        // External document untouched.
        let external = read_document(store.external_path()).unwrap();
        assert_eq!(external.app_by_id("video", "e1").unwrap().path, "/opt/mixer");
    }

    #[test]
    fn update_app_fails_when_the_owning_document_lacks_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded_store(dir.path());

        // "e1" lives in the external document; routing by builtin misses it.
        let err = store
            .update_app(entry("e1", "mixer", "video", EntryOrigin::Builtin))
            .unwrap_err();
        assert!(matches!(err, Error::ApplicationNotFound { .. }));
    }

    #[test]
    fn delete_app_determines_origin_from_the_merged_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded_store(dir.path());

        store.delete_app("video", "e1").unwrap();

        let external = read_document(store.external_path()).unwrap();
        assert!(external.category("video").unwrap().apps.is_empty());
        let builtin = read_document(store.builtin_path()).unwrap();
        assert_eq!(builtin.category("video").unwrap().apps.len(), 1);
    }

    #[test]
    fn delete_app_unknown_id_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded_store(dir.path());

        let err = store.delete_app("video", "nope").unwrap_err();
        assert!(matches!(err, Error::ApplicationNotFound { .. }));
        let err = store.delete_app("nope", "e1").unwrap_err();
        assert!(matches!(err, Error::CategoryNotFound { .. }));
    }

    #[test]
    fn add_category_inserts_into_both_documents() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded_store(dir.path());

        store.add_category("audio", "Audio").unwrap();

        for path in [store.builtin_path(), store.external_path()] {
            let doc = read_document(path).unwrap();
            let category = doc.category("audio").unwrap();
            assert_eq!(category.name, "Audio");
            assert!(category.apps.is_empty());
        }
    }

    #[test]
    fn add_category_rejects_ids_present_in_either_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded_store(dir.path());

        let err = store.add_category("video", "Video Again").unwrap_err();
        assert!(matches!(err, Error::DuplicateCategory { .. }));
    }

    #[test]
    fn update_category_renames_wherever_present() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded_store(dir.path());

        store.update_category("video", "Moving Pictures").unwrap();

        for path in [store.builtin_path(), store.external_path()] {
            let doc = read_document(path).unwrap();
            assert_eq!(doc.category("video").unwrap().name, "Moving Pictures");
        }
        // Absent id is not an error.
        store.update_category("missing", "Whatever").unwrap();
    }

    #[test]
    fn delete_category_is_guarded_while_apps_remain() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded_store(dir.path());

        let err = store.delete_category("video").unwrap_err();
        assert!(matches!(err, Error::CategoryNotEmpty { .. }));

        store.delete_app("video", "b1").unwrap();
        store.delete_app("video", "e1").unwrap();
        store.delete_category("video").unwrap();

        for path in [store.builtin_path(), store.external_path()] {
            let doc = read_document(path).unwrap();
            assert!(doc.category("video").is_none());
        }
    }

    #[test]
    fn import_replaces_the_external_document_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded_store(dir.path());

        let doc = serde_json::json!({
            "categories": [
                { "id": "imported", "name": "Imported", "apps": [] }
            ]
        });
        store.import(doc).unwrap();

        let external = read_document(store.external_path()).unwrap();
        assert_eq!(external.categories.len(), 1);
        assert!(external.category("imported").is_some());
        // Builtin document and its half of the merged view survive.
        assert!(store.merged().app("video", "recorder").is_some());
    }

    #[test]
    fn import_rejects_documents_without_a_category_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded_store(dir.path());
        let before = std::fs::read_to_string(store.external_path()).unwrap();

        let err = store.import(serde_json::json!({})).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat));
        let err = store
            .import(serde_json::json!({ "categories": "nope" }))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat));

        let after = std::fs::read_to_string(store.external_path()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn generated_ids_embed_the_category() {
        let id = generate_entry_id("video");
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts[0], "video");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
    }
}
