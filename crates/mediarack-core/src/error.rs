//! Typed failures for catalogue and launch operations.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the operations surface can report.
///
/// Each variant carries the identifying key of the entry, category, or path
/// involved so callers can render an actionable message.
#[derive(Debug, Error)]
pub enum Error {
    #[error("application not accessible: {}", path.display())]
    AppNotAccessible { path: PathBuf },

    #[error("only external applications can be added, got origin \"{origin}\"")]
    InvalidOrigin { origin: &'static str },

    #[error("category not found: {id}")]
    CategoryNotFound { id: String },

    #[error("application not found: {id} (category {category})")]
    ApplicationNotFound { id: String, category: String },

    #[error("an application named \"{name}\" already exists in category {category}")]
    DuplicateName { name: String, category: String },

    #[error("category id already exists: {id}")]
    DuplicateCategory { id: String },

    #[error("category {id} still contains applications")]
    CategoryNotEmpty { id: String },

    #[error("invalid catalogue format")]
    InvalidFormat,

    #[error("directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("no executable found under {}", path.display())]
    NoExecutableFound { path: PathBuf },

    #[error("download failed: {reason}")]
    DownloadFailed { reason: String },

    #[error("file watch failed: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed catalogue document: {0}")]
    Json(#[from] serde_json::Error),
}
