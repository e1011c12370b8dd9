//! Catalogue data model - application entries, categories, documents.

use serde::{Deserialize, Serialize};

/// Which on-disk document owns an application entry.
///
/// Fixed at creation; an entry never migrates between documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryOrigin {
    Builtin,
    External,
}

impl EntryOrigin {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::External => "external",
        }
    }
}

/// A single launchable application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEntry {
    /// Generated unique id, stable across merges.
    pub id: String,

    /// Display name, unique within its category.
    pub name: String,

    /// Executable path: absolute, or `./`-prefixed meaning relative to the
    /// user data root.
    pub path: String,

    #[serde(default)]
    pub icon: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,

    /// Argument template; `{input}` is substituted with the input file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,

    /// Id of the category this entry belongs to.
    pub category: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// Owning document, serialized as `type`.
    #[serde(rename = "type")]
    pub origin: EntryOrigin,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_downloaded: Option<bool>,

    /// Explicit working directory; the executable's own directory otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
}

/// A named group of applications.
///
/// Ids are unique across the whole catalogue. App order comes from the
/// underlying document and carries no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub apps: Vec<AppEntry>,
}

/// One catalogue document, or the merged view derived from both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub categories: Vec<Category>,

    /// Root folder for downloaded builtin tools; carried by the builtin
    /// document only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builtin_apps_folder: Option<String>,
}

impl Catalog {
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn category_mut(&mut self, id: &str) -> Option<&mut Category> {
        self.categories.iter_mut().find(|c| c.id == id)
    }

    /// Look up an application by display name within a category.
    pub fn app(&self, category_id: &str, name: &str) -> Option<&AppEntry> {
        self.category(category_id)?.apps.iter().find(|a| a.name == name)
    }

    /// Look up an application by id within a category.
    pub fn app_by_id(&self, category_id: &str, app_id: &str) -> Option<&AppEntry> {
        self.category(category_id)?.apps.iter().find(|a| a.id == app_id)
    }
}
