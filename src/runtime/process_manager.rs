// src/runtime/process_manager.rs
//! Process manager for spawning and stopping runner processes

use crate::utils::errors::{MazeError, Result};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Name of the runner executable
pub const RUNNER_BINARY: &str = "maze-runner";

/// Configuration for spawning a process
#[derive(Debug, Clone, Default)]
pub struct SpawnConfig {
    /// Executable to run
    pub program: PathBuf,

    /// Command-line arguments
    pub args: Vec<String>,

    /// Environment variables
    pub env_vars: Vec<(String, String)>,
}

/// Process manager for runner processes
pub struct ProcessManager {
    /// Resolved runner executable (cached)
    runner_path: Option<PathBuf>,
}

impl ProcessManager {
    /// Create a new process manager
    pub fn new() -> Self {
        Self { runner_path: None }
    }

    /// Find the runner executable.
    ///
    /// An explicit path wins; otherwise look beside the current executable.
    pub fn find_runner(&mut self, configured: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = &self.runner_path {
            return Ok(path.clone());
        }

        let candidate = match configured {
            Some(path) => path.to_path_buf(),
            None => {
                let exe = std::env::current_exe().map_err(|e| {
                    MazeError::ProcessSpawnFailed(format!("cannot locate current executable: {}", e))
                })?;
                exe.with_file_name(format!("{}{}", RUNNER_BINARY, std::env::consts::EXE_SUFFIX))
            }
        };

        if !candidate.is_file() {
            return Err(MazeError::ProcessSpawnFailed(format!(
                "runner executable {} not found",
                candidate.display()
            )));
        }

        info!("Found runner at {:?}", candidate);
        self.runner_path = Some(candidate.clone());
        Ok(candidate)
    }

    /// Spawn a new process
    pub fn spawn(&self, config: SpawnConfig) -> Result<Child> {
        debug!("Spawning process: {:?}", config.program);

        let mut command = Command::new(&config.program);
        command.args(&config.args);

        for (key, value) in &config.env_vars {
            command.env(key, value);
        }

        // Runners never read stdin; their logs share our stderr. A process
        // group of their own keeps terminal Ctrl-C away from them, so they
        // stop through the quit flag instead.
        command
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .process_group(0);

        let child = command.spawn().map_err(|e| {
            MazeError::ProcessSpawnFailed(format!(
                "failed to spawn {}: {}",
                config.program.display(),
                e
            ))
        })?;

        debug!("Process spawned with PID: {:?}", child.id());

        Ok(child)
    }

    /// Ask a process to stop. `Ok(false)` means it was already gone.
    pub fn terminate(&self, pid: u32) -> Result<bool> {
        self.signal(pid, Signal::SIGTERM)
    }

    /// Kill a process outright. `Ok(false)` means it was already gone.
    pub fn force_kill(&self, pid: u32) -> Result<bool> {
        self.signal(pid, Signal::SIGKILL)
    }

    fn signal(&self, pid: u32, signal: Signal) -> Result<bool> {
        debug!("Sending {:?} to PID {}", signal, pid);
        match kill(Pid::from_raw(pid as i32), signal) {
            Ok(()) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(e) => Err(MazeError::RuntimeError(format!(
                "Failed to send {:?} to PID {}: {}",
                signal, pid, e
            ))),
        }
    }
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> SpawnConfig {
        SpawnConfig {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), script.to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_find_runner_explicit_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut manager = ProcessManager::new();

        let found = manager.find_runner(Some(file.path())).unwrap();
        assert_eq!(found, file.path());
        // cached
        assert_eq!(manager.find_runner(None).unwrap(), found);
    }

    #[test]
    fn test_find_runner_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = ProcessManager::new();
        let result = manager.find_runner(Some(&dir.path().join("absent")));
        assert!(matches!(result, Err(MazeError::ProcessSpawnFailed(_))));
    }

    #[tokio::test]
    async fn test_spawn_passes_env_and_exit_code() {
        let manager = ProcessManager::new();
        let mut config = shell("exit $MAZE_TEST_CODE");
        config.env_vars.push(("MAZE_TEST_CODE".to_string(), "3".to_string()));

        let mut child = manager.spawn(config).unwrap();
        let status = child.wait().await.unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn test_terminate_running_process() {
        use std::os::unix::process::ExitStatusExt;

        let manager = ProcessManager::new();
        let mut child = manager.spawn(shell("sleep 30")).unwrap();
        let pid = child.id().unwrap();

        assert!(manager.terminate(pid).unwrap());
        let status = child.wait().await.unwrap();
        assert_eq!(status.signal(), Some(Signal::SIGTERM as i32));
    }

    #[tokio::test]
    async fn test_signal_to_reaped_process_reports_gone() {
        let manager = ProcessManager::new();
        let mut child = manager.spawn(shell("exit 0")).unwrap();
        let pid = child.id().unwrap();
        child.wait().await.unwrap();

        assert!(!manager.terminate(pid).unwrap());
        assert!(!manager.force_kill(pid).unwrap());
    }

    #[tokio::test]
    async fn test_runner_gets_its_own_process_group() {
        let manager = ProcessManager::new();
        let mut child = manager.spawn(shell("sleep 30")).unwrap();
        let pid = Pid::from_raw(child.id().unwrap() as i32);

        let group = nix::unistd::getpgid(Some(pid)).unwrap();
        assert_eq!(group, pid);
        assert_ne!(group, nix::unistd::getpgrp());

        manager.force_kill(pid.as_raw() as u32).unwrap();
        child.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_missing_program() {
        let manager = ProcessManager::new();
        let config = SpawnConfig {
            program: PathBuf::from("/nonexistent/maze-runner"),
            ..Default::default()
        };
        assert!(matches!(
            manager.spawn(config),
            Err(MazeError::ProcessSpawnFailed(_))
        ));
    }
}
