//! Worker executable resolution — packaged binary vs. development script.

use std::path::{Path, PathBuf};

use tokio::process::Command;

/// Directory that marks a packaged distribution, relative to the app root.
pub const WORKER_DIST_DIR: &str = "dist";
/// Module name of the worker: both the script stem and the bundled binary.
pub const WORKER_MODULE: &str = "api";
/// Interpreter used to run the worker script in a development layout.
pub const WORKER_INTERPRETER: &str = "python";

/// A resolved worker invocation: the program plus its leading arguments.
/// Callers append their own extras (the app root) at spawn time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    /// Build the spawnable command, appending `extra_args`.
    pub fn to_command(&self, extra_args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).args(extra_args);
        apply_creation_flags(&mut cmd);
        cmd
    }
}

/// Packaged iff the bundled distribution directory exists under the app root.
pub fn is_packaged(app_root: &Path) -> bool {
    app_root.join(WORKER_DIST_DIR).is_dir()
}

/// Name of the bundled worker binary. Windows binaries carry the executable
/// suffix; other platforms do not.
fn packaged_binary_name() -> String {
    if cfg!(windows) {
        format!("{}.exe", WORKER_MODULE)
    } else {
        WORKER_MODULE.to_string()
    }
}

/// Decide how the worker is launched for the given app root. Packaged
/// layouts run the bundled binary directly; development layouts run the
/// script through the interpreter.
pub fn resolve_worker(app_root: &Path) -> WorkerCommand {
    if is_packaged(app_root) {
        WorkerCommand {
            program: app_root
                .join(WORKER_DIST_DIR)
                .join(WORKER_MODULE)
                .join(packaged_binary_name()),
            args: Vec::new(),
        }
    } else {
        WorkerCommand {
            program: PathBuf::from(WORKER_INTERPRETER),
            args: vec![app_root
                .join(format!("{}.py", WORKER_MODULE))
                .to_string_lossy()
                .to_string()],
        }
    }
}

/// Hide the console window the worker would otherwise open on Windows.
#[cfg(target_os = "windows")]
fn apply_creation_flags(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x08000000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(target_os = "windows"))]
fn apply_creation_flags(_cmd: &mut Command) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_layout_runs_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_worker(dir.path());

        assert_eq!(resolved.program, PathBuf::from(WORKER_INTERPRETER));
        assert_eq!(resolved.args.len(), 1);
        assert!(resolved.args[0].ends_with("api.py"));
    }

    #[test]
    fn test_packaged_layout_runs_bundled_binary() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(WORKER_DIST_DIR).join(WORKER_MODULE)).unwrap();

        let resolved = resolve_worker(dir.path());
        assert!(resolved.args.is_empty());

        let expected_name = if cfg!(windows) { "api.exe" } else { "api" };
        assert_eq!(
            resolved.program.file_name().and_then(|n| n.to_str()),
            Some(expected_name)
        );
        assert!(resolved.program.starts_with(dir.path()));
    }

    #[test]
    fn test_dist_file_is_not_a_packaged_layout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(WORKER_DIST_DIR), b"").unwrap();
        assert!(!is_packaged(dir.path()));
    }

    #[test]
    fn test_extra_args_ride_along() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_worker(dir.path());
        let cmd = resolved.to_command(&[dir.path().to_string_lossy().to_string()]);

        let args: Vec<_> = cmd.as_std().get_args().collect();
        assert_eq!(args.len(), 2, "script path plus app root");
    }
}
