//! Subprocess runner for container steps executed on the local machine

use crate::execution::ExecutionError;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Runs a command line as a child process with a timeout
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// Timeout for command execution in seconds
    timeout_secs: u64,
}

impl ProcessRunner {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Run `command` (program followed by its arguments) and return stdout
    ///
    /// # Errors
    /// Returns `ExecutionError` if:
    /// - the command line is empty
    /// - the program cannot be spawned
    /// - it exits with a non-zero status
    /// - it does not finish within the timeout
    pub async fn run(&self, command: &[String]) -> Result<String, ExecutionError> {
        let (program, args) = command.split_first().ok_or(ExecutionError::EmptyCommand)?;
        debug!("Spawning {} with {} arguments", program, args.len());

        let result = timeout(
            Duration::from_secs(self.timeout_secs),
            Command::new(program).args(args).kill_on_drop(true).output(),
        )
        .await
        .map_err(|_| ExecutionError::Timeout {
            program: program.clone(),
            secs: self.timeout_secs,
        })?;

        let output = result.map_err(|source| ExecutionError::Spawn {
            program: program.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            warn!("{} exited with code {}: {}", program, code, stderr);
            return Err(ExecutionError::ProcessFailed {
                program: program.clone(),
                code,
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("{} returned {} bytes of output", program, stdout.len());
        Ok(stdout)
    }
}
