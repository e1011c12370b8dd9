//! Process launch: path resolution, access checks, strategy spawn.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;

use crate::catalog::model::AppEntry;
use crate::error::{Error, Result};
use crate::resolve::is_executable;

use super::registry::ProcessRegistry;
use super::strategy::LaunchStrategy;

/// Placeholder substituted with the input file in a params template.
const INPUT_PLACEHOLDER: &str = "{input}";

/// Launches catalogue entries and tracks them in a [`ProcessRegistry`].
pub struct AppLauncher {
    data_root: PathBuf,
    registry: Arc<ProcessRegistry>,
}

impl AppLauncher {
    pub fn new(data_root: PathBuf) -> Self {
        Self {
            data_root,
            registry: Arc::new(ProcessRegistry::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    /// Resolve a catalogue path: `./`-prefixed entries live under the user
    /// data root, everything else is used verbatim.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        match path.strip_prefix("./") {
            Some(rest) => self.data_root.join(rest),
            None => PathBuf::from(path),
        }
    }

    /// Check that the entry's executable exists and is executable, and
    /// return the resolved path.
    pub fn verify_access(&self, entry: &AppEntry) -> Result<PathBuf> {
        let path = self.resolve_path(&entry.path);
        if !is_executable(&path) {
            return Err(Error::AppNotAccessible { path });
        }
        Ok(path)
    }

    /// Launch an entry, optionally substituting `input_file` into its
    /// params template.
    ///
    /// Any failure before the spawn (missing executable, unreadable path)
    /// propagates and nothing is recorded. Once the spawn succeeded the
    /// call returns; later process errors only log and deregister. The new
    /// handle is recorded under the entry's name, replacing a previous one
    /// without terminating it.
    pub async fn launch(&self, entry: &AppEntry, input_file: Option<&str>) -> Result<()> {
        let exe = self.verify_access(entry)?;
        let args = build_args(entry.params.as_deref().unwrap_or(""), input_file);
        let strategy = LaunchStrategy::for_executable(&exe);

        tracing::info!(
            app = %entry.name,
            path = %exe.display(),
            strategy = strategy.name(),
            "Launching application"
        );

        match strategy {
            LaunchStrategy::Detached { env, cwd } => {
                self.spawn_detached(entry, &exe, &args, env, &cwd)
            }
            LaunchStrategy::Tracked => self.spawn_tracked(entry, &exe, &args),
        }
    }

    fn spawn_detached(
        &self,
        entry: &AppEntry,
        exe: &Path,
        args: &[String],
        env: Vec<(String, String)>,
        cwd: &Path,
    ) -> Result<()> {
        let mut command = Command::new(exe);
        command
            .args(args)
            .envs(env)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn()?;
        self.track(entry, child, false);
        Ok(())
    }

    fn spawn_tracked(&self, entry: &AppEntry, exe: &Path, args: &[String]) -> Result<()> {
        let cwd = entry
            .working_directory
            .as_deref()
            .map(|dir| self.resolve_path(dir))
            .unwrap_or_else(|| exe.parent().unwrap_or(Path::new(".")).to_path_buf());

        let mut command = Command::new(exe);
        command
            .args(args)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn()?;
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(entry.name.clone(), "stdout", stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(entry.name.clone(), "stderr", stderr));
        }
        self.track(entry, child, true);
        Ok(())
    }

    /// Record the child and start its monitor task.
    fn track(&self, entry: &AppEntry, child: Child, log_exit: bool) {
        let (kill_tx, kill_rx) = oneshot::channel();
        let pid = child.id();
        let token = self.registry.insert(&entry.name, pid, kill_tx);
        let registry = Arc::clone(&self.registry);
        let name = entry.name.clone();
        tokio::spawn(monitor(child, kill_rx, registry, name, token, log_exit));
    }
}

/// Waits for exit or a stop request.
///
/// When the record is replaced by a relaunch the kill sender is dropped;
/// the monitor then detaches without touching the process, and its stale
/// token keeps it from evicting the replacement record.
async fn monitor(
    mut child: Child,
    mut kill_rx: oneshot::Receiver<()>,
    registry: Arc<ProcessRegistry>,
    name: String,
    token: u64,
    log_exit: bool,
) {
    tokio::select! {
        status = child.wait() => {
            match status {
                Ok(status) if log_exit => {
                    tracing::info!(app = %name, code = ?status.code(), "Application exited");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(app = %name, error = %err, "Process error");
                }
            }
            registry.deregister(&name, token);
        }
        requested = &mut kill_rx => {
            if requested.is_ok() {
                if let Err(err) = child.start_kill() {
                    tracing::warn!(app = %name, error = %err, "Failed to signal application");
                }
            }
            // On Err the record was replaced or dropped; leave the
            // process alone and stop tracking it.
        }
    }
}

async fn forward_lines<R>(app: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if stream == "stderr" {
            tracing::warn!(app = %app, "[{stream}] {line}");
        } else {
            tracing::info!(app = %app, "[{stream}] {line}");
        }
    }
}

/// Build the argument list from a params template: substitute the input
/// placeholder, then split on whitespace. An empty template yields no
/// arguments.
fn build_args(template: &str, input_file: Option<&str>) -> Vec<String> {
    if template.is_empty() {
        return Vec::new();
    }
    let filled = match input_file {
        Some(input) => template.replace(INPUT_PLACEHOLDER, input),
        None => template.to_string(),
    };
    filled.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::EntryOrigin;

    fn entry(name: &str, path: &str) -> AppEntry {
        AppEntry {
            id: format!("test_{name}"),
            name: name.to_string(),
            path: path.to_string(),
            icon: String::new(),
            icon_path: None,
            params: None,
            category: "video".to_string(),
            description: String::new(),
            website: None,
            origin: EntryOrigin::External,
            download_url: None,
            is_downloaded: None,
            working_directory: None,
        }
    }

    #[test]
    fn empty_template_yields_no_arguments() {
        assert!(build_args("", Some("/tmp/in.mp4")).is_empty());
    }

    #[test]
    fn input_placeholder_is_substituted_before_splitting() {
        let args = build_args("-i {input} --fast", Some("/tmp/in.mp4"));
        assert_eq!(args, ["-i", "/tmp/in.mp4", "--fast"]);
    }

    #[test]
    fn template_without_input_is_split_as_is() {
        let args = build_args("--mode batch", None);
        assert_eq!(args, ["--mode", "batch"]);
    }

    #[test]
    fn relative_marker_paths_root_under_the_data_directory() {
        let launcher = AppLauncher::new(PathBuf::from("/data/mediarack"));
        assert_eq!(
            launcher.resolve_path("./apps/video/tool.exe"),
            Path::new("/data/mediarack/apps/video/tool.exe")
        );
        assert_eq!(
            launcher.resolve_path("/opt/tool.exe"),
            Path::new("/opt/tool.exe")
        );
    }

    #[tokio::test]
    async fn launching_a_missing_executable_fails_without_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = AppLauncher::new(dir.path().to_path_buf());

        let missing = entry("ghost", "/nonexistent/tool");
        let err = launcher.launch(&missing, None).await.unwrap_err();
        assert!(matches!(err, Error::AppNotAccessible { .. }));
        assert!(launcher.registry().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn double_launch_keeps_one_record_and_both_processes() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = AppLauncher::new(dir.path().to_path_buf());

        let mut sleeper = entry("sleeper", "/bin/sleep");
        sleeper.params = Some("30".to_string());

        launcher.launch(&sleeper, None).await.unwrap();
        let first_pid = launcher.registry().pid("sleeper");
        launcher.launch(&sleeper, None).await.unwrap();

        assert_eq!(launcher.registry().len(), 1);
        let second_pid = launcher.registry().pid("sleeper");
        assert_ne!(first_pid, second_pid);

        launcher.registry().stop_all();
        // Let the monitors process the stop requests.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_deregisters_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = AppLauncher::new(dir.path().to_path_buf());

        let truthy = entry("true", "/bin/true");
        launcher.launch(&truthy, None).await.unwrap();

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(10);
        while launcher.registry().contains("true") {
            assert!(tokio::time::Instant::now() < deadline, "record never cleared");
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_removes_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = AppLauncher::new(dir.path().to_path_buf());

        let mut sleeper = entry("sleeper", "/bin/sleep");
        sleeper.params = Some("30".to_string());
        launcher.launch(&sleeper, None).await.unwrap();
        assert!(launcher.registry().contains("sleeper"));

        launcher.registry().stop("sleeper");
        assert!(launcher.registry().is_empty());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}
