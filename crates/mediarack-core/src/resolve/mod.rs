//! Executable resolution: find the best-matching executable under a root.

mod similarity;

pub use similarity::similarity;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Generic launcher base names checked before anything else.
const PRIORITY_NAMES: [&str; 3] = ["portable", "launcher", "start"];

#[cfg(windows)]
const EXECUTABLE_EXTENSIONS: [&str; 3] = ["exe", "bat", "cmd"];

/// Find the executable under `root` that best matches `app_name`.
///
/// If `root` names a file, its containing directory becomes the search
/// root. Every executable in the tree is enumerated (depth-unbounded;
/// symlink loops are not guarded against), then picked in order:
///
/// 1. base name equals one of [`PRIORITY_NAMES`] or the app name itself,
///    case-insensitive;
/// 2. base name contains the normalized app name;
/// 3. the first executable in enumeration order.
pub fn find_closest_executable(root: &Path, app_name: &str) -> Result<PathBuf> {
    let root = if root.is_file() {
        root.parent().unwrap_or(root)
    } else {
        root
    };
    if !root.is_dir() {
        return Err(Error::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }

    let executables = collect_executables(root);
    if executables.is_empty() {
        return Err(Error::NoExecutableFound {
            path: root.to_path_buf(),
        });
    }

    let target = app_name.to_lowercase();
    for candidate in &executables {
        let stem = base_name(candidate).to_lowercase();
        if PRIORITY_NAMES.contains(&stem.as_str()) || stem == target {
            return Ok(candidate.clone());
        }
    }

    let normalized = normalize(app_name);
    if !normalized.is_empty() {
        for candidate in &executables {
            if base_name(candidate).to_lowercase().contains(&normalized) {
                return Ok(candidate.clone());
            }
        }
    }

    Ok(executables[0].clone())
}

/// Lowercased with whitespace removed, for substring matching.
fn normalize(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect()
}

fn base_name(path: &Path) -> &str {
    path.file_stem().and_then(OsStr::to_str).unwrap_or("")
}

fn collect_executables(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_executable(path))
        .collect()
}

/// Whether a file can be launched: the executable bit on unix, a known
/// extension on Windows.
#[cfg(unix)]
pub(crate) fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(windows)]
pub(crate) fn is_executable(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(OsStr::to_str)
            .map(|ext| {
                EXECUTABLE_EXTENSIONS
                    .iter()
                    .any(|e| ext.eq_ignore_ascii_case(e))
            })
            .unwrap_or(false)
}
