//! Download collaborator: fetch a remote archive and unpack a tool.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

use crate::catalog::{AppEntry, CatalogService};
use crate::error::{Error, Result};
use crate::launch::infer_working_directory;
use crate::resolve::find_closest_executable;

/// Fallback executable name when unpacking finds nothing.
const DEFAULT_EXECUTABLE: &str = "portable.exe";

/// Black-box "fetch and unpack" boundary.
#[async_trait]
pub trait ToolFetcher: Send + Sync {
    /// Download `url` and unpack it into `dest_dir`, returning the resolved
    /// executable path if one was found.
    async fn fetch_and_unpack(
        &self,
        url: &str,
        dest_dir: &Path,
        app_name: &str,
    ) -> Result<Option<PathBuf>>;
}

/// HTTP implementation: bare `.exe` payloads are copied into place, zip
/// archives are extracted and the destination scanned with the resolver.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolFetcher for HttpFetcher {
    async fn fetch_and_unpack(
        &self,
        url: &str,
        dest_dir: &Path,
        app_name: &str,
    ) -> Result<Option<PathBuf>> {
        std::fs::create_dir_all(dest_dir)?;

        let file_name = url.rsplit('/').next().unwrap_or("download").to_string();
        let temp_path = std::env::temp_dir().join(format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            file_name
        ));

        download_to(&self.client, url, &temp_path).await?;

        let result = if file_name.to_lowercase().ends_with(".exe") {
            let target = dest_dir.join(&file_name);
            std::fs::copy(&temp_path, &target)?;
            Some(target)
        } else {
            unpack_archive(&temp_path, dest_dir)?;
            find_closest_executable(dest_dir, app_name).ok()
        };

        let _ = std::fs::remove_file(&temp_path);
        Ok(result)
    }
}

async fn download_to(client: &reqwest::Client, url: &str, target: &Path) -> Result<()> {
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|err| Error::DownloadFailed {
            reason: err.to_string(),
        })?;
    if !response.status().is_success() {
        return Err(Error::DownloadFailed {
            reason: format!("HTTP {}", response.status()),
        });
    }

    let total = response.content_length();
    let mut downloaded: u64 = 0;
    let mut file = std::fs::File::create(target)?;
    while let Some(chunk) = response.chunk().await.map_err(|err| Error::DownloadFailed {
        reason: err.to_string(),
    })? {
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        if let Some(total) = total.filter(|t| *t > 0) {
            tracing::debug!(
                url,
                progress = format_args!("{:.1}%", downloaded as f64 / total as f64 * 100.0),
                "Downloading"
            );
        }
    }
    Ok(())
}

fn unpack_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|err| Error::DownloadFailed {
        reason: format!("unreadable archive: {err}"),
    })?;
    zip.extract(dest).map_err(|err| Error::DownloadFailed {
        reason: format!("extraction failed: {err}"),
    })?;
    Ok(())
}

/// Download a catalogue entry's tool and record the result through the
/// mutation API: the entry's `path`, `working_directory` and
/// `is_downloaded` are updated in its owning document.
pub async fn install(
    service: &CatalogService,
    fetcher: &dyn ToolFetcher,
    data_root: &Path,
    category_id: &str,
    app_name: &str,
) -> Result<AppEntry> {
    let merged = service.config().await;
    let entry = merged
        .app(category_id, app_name)
        .cloned()
        .ok_or_else(|| Error::ApplicationNotFound {
            id: app_name.to_string(),
            category: category_id.to_string(),
        })?;
    let url = entry
        .download_url
        .clone()
        .ok_or_else(|| Error::DownloadFailed {
            reason: format!("entry \"{app_name}\" has no download url"),
        })?;

    let apps_folder = merged
        .builtin_apps_folder
        .clone()
        .unwrap_or_else(|| "./apps".to_string());
    let folder_root = match apps_folder.strip_prefix("./") {
        Some(rest) => data_root.join(rest),
        None => PathBuf::from(apps_folder),
    };
    let dest = folder_root.join(category_id).join(slug(app_name));

    tracing::info!(app = app_name, url = %url, dest = %dest.display(), "Installing tool");
    let exe = fetcher
        .fetch_and_unpack(&url, &dest, app_name)
        .await?
        .unwrap_or_else(|| dest.join(DEFAULT_EXECUTABLE));
    let working_directory = infer_working_directory(&exe);

    let mut updated = entry;
    updated.path = exe.display().to_string();
    updated.working_directory = Some(working_directory.display().to_string());
    updated.is_downloaded = Some(true);
    service.update_app(updated.clone()).await?;
    Ok(updated)
}

/// Folder-name slug for a tool: lowercased, whitespace collapsed to dashes.
fn slug(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
