//! Launch strategies: detached fire-and-forget vs tracked with output
//! forwarding, selected by a predicate over the resolved executable.

use std::path::{Path, PathBuf};

/// Executable name fragment identifying the bundled streaming recorder.
const STREAMING_RECORDER: &str = "obs64";

/// How a resolved executable is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchStrategy {
    /// Fire-and-forget: extra environment injected, output discarded, the
    /// child fully detached from the launcher's lifetime.
    Detached {
        env: Vec<(String, String)>,
        cwd: PathBuf,
    },
    /// Output forwarded to the launcher's log, exit observed.
    Tracked,
}

impl LaunchStrategy {
    /// Pick the strategy for a resolved executable path.
    pub fn for_executable(path: &Path) -> Self {
        if is_streaming_recorder(path) {
            Self::Detached {
                env: recorder_environment(path),
                cwd: path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            }
        } else {
            Self::Tracked
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Detached { .. } => "detached",
            Self::Tracked => "tracked",
        }
    }
}

fn is_streaming_recorder(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_lowercase().contains(STREAMING_RECORDER))
        .unwrap_or(false)
}

/// The recorder keeps its data and plugin trees two levels above the
/// executable's directory; it also wants a fixed locale pair.
fn recorder_environment(exe: &Path) -> Vec<(String, String)> {
    let exe_dir = exe.parent().unwrap_or(Path::new("."));
    let base_dir = exe_dir
        .parent()
        .and_then(Path::parent)
        .unwrap_or(exe_dir);

    vec![
        (
            "OBS_DATA_PATH".to_string(),
            base_dir.join("data").join("obs-studio").display().to_string(),
        ),
        (
            "OBS_PLUGINS_PATH".to_string(),
            base_dir.join("obs-plugins").join("64bit").display().to_string(),
        ),
        ("LANG".to_string(), "zh-CN".to_string()),
        ("LC_ALL".to_string(), "zh-CN".to_string()),
    ]
}

/// Working directory a freshly installed tool should run from: the
/// recorder runs from its `bin` directory's parent, everything else from
/// the executable's own directory.
pub fn infer_working_directory(exe: &Path) -> PathBuf {
    if is_streaming_recorder(exe) {
        exe.parent()
            .and_then(Path::parent)
            .unwrap_or(Path::new("."))
            .to_path_buf()
    } else {
        exe.parent().unwrap_or(Path::new(".")).to_path_buf()
    }
}
