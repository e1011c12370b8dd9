//! The two-document merge that produces the derived catalogue view.

use super::model::{Catalog, Category};

/// Merge the builtin and external documents into one view.
///
/// Categories present in only one document appear as-is. Categories present
/// in both have their app lists concatenated, builtin first; an app whose id
/// collides with one already merged is dropped (first occurrence wins). The
/// result is always rebuilt in full, never patched.
pub fn merge(builtin: &Catalog, external: &Catalog) -> Catalog {
    let mut merged = Catalog {
        categories: Vec::new(),
        builtin_apps_folder: builtin.builtin_apps_folder.clone(),
    };
    merge_categories(&mut merged, &builtin.categories);
    merge_categories(&mut merged, &external.categories);
    merged
}

fn merge_categories(target: &mut Catalog, categories: &[Category]) {
    for incoming in categories {
        match target.category_mut(&incoming.id) {
            None => target.categories.push(incoming.clone()),
            Some(existing) => {
                for app in &incoming.apps {
                    if !existing.apps.iter().any(|a| a.id == app.id) {
                        existing.apps.push(app.clone());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::{AppEntry, EntryOrigin};

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

    fn category(id: &str, apps: Vec<AppEntry>) -> Category {
        Category {
            id: id.to_string(),
            name: id.to_uppercase(),
            apps,
        }
    }

    #[test]
    fn merging_a_document_with_itself_is_identity() {
        let doc = Catalog {
            categories: vec![category(
                "video",
                vec![
                    entry("a1", "recorder", "video", EntryOrigin::Builtin),
                    entry("a2", "editor", "video", EntryOrigin::Builtin),
                ],
            )],
            builtin_apps_folder: Some("./apps".to_string()),
        };

        assert_eq!(merge(&doc, &doc), doc);
    }

    #[test]
    fn disjoint_categories_merge_to_the_plain_union() {
        let builtin = Catalog {
            categories: vec![category(
                "video",
                vec![entry("a1", "recorder", "video", EntryOrigin::Builtin)],
            )],
            builtin_apps_folder: None,
        };
        let external = Catalog {
            categories: vec![category(
                "audio",
                vec![entry("b1", "mixer", "audio", EntryOrigin::External)],
            )],
            builtin_apps_folder: None,
        };

        let merged = merge(&builtin, &external);
        assert_eq!(merged.categories.len(), 2);
        assert_eq!(
            merged.category("video").unwrap().apps,
            builtin.categories[0].apps
        );
        assert_eq!(
            merged.category("audio").unwrap().apps,
            external.categories[0].apps
        );
    }

    #[test]
    fn colliding_app_ids_keep_the_builtin_entry() {
        let builtin = Catalog {
            categories: vec![category(
                "video",
                vec![entry("a1", "recorder", "video", EntryOrigin::Builtin)],
            )],
            builtin_apps_folder: None,
        };
        let external = Catalog {
            categories: vec![category(
                "video",
                vec![
                    entry("a1", "shadowed", "video", EntryOrigin::External),
                    entry("a2", "mixer", "video", EntryOrigin::External),
                ],
            )],
            builtin_apps_folder: None,
        };

        let merged = merge(&builtin, &external);
        let apps = &merged.category("video").unwrap().apps;
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].id, "a1");
        assert_eq!(apps[0].name, "recorder");
        assert_eq!(apps[0].origin, EntryOrigin::Builtin);
        assert_eq!(apps[1].id, "a2");
    }

    #[test]
    fn builtin_apps_folder_comes_from_the_builtin_document() {
        let builtin = Catalog {
            categories: Vec::new(),
            builtin_apps_folder: Some("./apps".to_string()),
        };
        let external = Catalog {
            categories: Vec::new(),
            builtin_apps_folder: Some("./ignored".to_string()),
        };

        let merged = merge(&builtin, &external);
        assert_eq!(merged.builtin_apps_folder.as_deref(), Some("./apps"));
    }
}
