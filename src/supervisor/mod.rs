//! Worker supervisor — exclusive owner of the external export process.
//!
//! At most one worker is alive at a time; every lifecycle transition goes
//! through this struct, never through raw shared state.

pub mod error;
pub mod launcher;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Child;

use error::SupervisorError;
use launcher::resolve_worker;

/// How long to wait after the termination signal before force-killing.
const STOP_GRACE: Duration = Duration::from_secs(5);

pub struct WorkerSupervisor {
    app_root: PathBuf,
    worker: Option<Child>,
}

impl WorkerSupervisor {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
            worker: None,
        }
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.worker.as_ref().and_then(|c| c.id())
    }

    /// Spawn the worker and keep its handle as the single owned process.
    /// `extra_args` are appended to the resolved invocation; the shell uses
    /// them to hand the worker the application root.
    pub fn start(&mut self, extra_args: &[String]) -> Result<u32, SupervisorError> {
        if self.worker.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }

        let resolved = resolve_worker(&self.app_root);
        tracing::info!(
            "Spawning worker: {} {:?} + {:?}",
            resolved.program.display(),
            resolved.args,
            extra_args
        );

        let child = resolved
            .to_command(extra_args)
            .spawn()
            .map_err(|e| SupervisorError::SpawnFailed {
                program: resolved.program.display().to_string(),
                reason: e.to_string(),
            })?;
        let pid = child
            .id()
            .ok_or_else(|| anyhow::anyhow!("Failed to get PID of spawned worker"))?;

        self.worker = Some(child);
        tracing::info!("Worker started with pid {}", pid);
        Ok(pid)
    }

    /// Send the OS termination signal to the owned worker, reap it, and
    /// clear ownership. Calling with no owned worker is a safe no-op.
    pub async fn stop(&mut self) -> Result<(), SupervisorError> {
        let Some(mut child) = self.worker.take() else {
            tracing::debug!("Stop requested with no worker running");
            return Ok(());
        };

        let Some(pid) = child.id() else {
            // Already reaped by the runtime; nothing left to signal.
            return Ok(());
        };

        tracing::info!("Stopping worker (pid {})", pid);
        if let Err(e) = terminate_pid(pid) {
            // The worker may have exited between the take and the signal.
            tracing::warn!("Termination signal to pid {} failed: {}", pid, e);
        }

        match tokio::time::timeout(STOP_GRACE, child.wait()).await {
            Ok(Ok(status)) => tracing::info!("Worker exited with {}", status),
            Ok(Err(e)) => tracing::warn!("Failed to reap worker (pid {}): {}", pid, e),
            Err(_) => {
                tracing::warn!("Worker (pid {}) ignored the termination signal, killing", pid);
                child
                    .kill()
                    .await
                    .map_err(|e| SupervisorError::TerminationFailed {
                        pid,
                        reason: e.to_string(),
                    })?;
            }
        }
        Ok(())
    }

    /// Clear ownership if the worker exited on its own, so the next export
    /// can start a fresh one. Returns the exit status when a reap happened.
    pub fn reap_exited(&mut self) -> Option<std::process::ExitStatus> {
        let child = self.worker.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!("Worker exited on its own with {}", status);
                self.worker = None;
                Some(status)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to poll worker state: {}", e);
                None
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn adopt(&mut self, child: Child) {
        self.worker = Some(child);
    }
}

/// Send the polite termination signal to a pid — SIGTERM on unix,
/// `TerminateProcess` on Windows.
fn terminate_pid(pid: u32) -> anyhow::Result<()> {
    #[cfg(target_os = "windows")]
    {
        use winapi::um::handleapi::CloseHandle;
        use winapi::um::processthreadsapi::{OpenProcess, TerminateProcess};
        use winapi::um::winnt::PROCESS_TERMINATE;

        unsafe {
            let handle = OpenProcess(PROCESS_TERMINATE, 0, pid);
            if handle.is_null() {
                anyhow::bail!("Failed to open process {}", pid);
            }
            let result = TerminateProcess(handle, 0);
            CloseHandle(handle);
            if result == 0 {
                anyhow::bail!("TerminateProcess failed for pid {}", pid);
            }
        }
    }

    #[cfg(not(target_os = "windows"))]
    {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
            .map_err(|e| anyhow::anyhow!("Failed to signal pid {}: {}", pid, e))?;
    }

    Ok(())
}
