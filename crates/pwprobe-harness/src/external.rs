//! External migration command runner
//!
//! Runs the configured command as a child process with the connection string
//! in one environment variable. The child is killed when the timeout elapses.

use crate::config::MigrationCommandConfig;
use pwprobe_core::{ProbeError, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Lines of stderr kept in a failure message
const STDERR_TAIL_LINES: usize = 5;

/// Captured output of a successful run
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Runs the migration command against one connection string
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    config: MigrationCommandConfig,
}

impl MigrationRunner {
    pub fn new(config: MigrationCommandConfig) -> Self {
        Self { config }
    }

    /// Resolve the program on `PATH`
    pub fn resolve_program(&self) -> Result<PathBuf> {
        which::which(&self.config.program).map_err(|e| {
            ProbeError::Command(format!("'{}' not found: {}", self.config.program, e))
        })
    }

    /// Run the command with `connection_string` in the configured variable.
    ///
    /// A non-zero exit fails with the tail of stderr. The connection string is
    /// never logged.
    #[tracing::instrument(skip(self, connection_string), fields(command = %self.config.display()))]
    pub async fn run(&self, connection_string: &str) -> Result<CommandOutput> {
        let program = self.resolve_program()?;

        let mut command = Command::new(program);
        command
            .args(&self.config.args)
            .env(&self.config.url_env, connection_string)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        let started = Instant::now();
        let child = command.spawn().map_err(|e| {
            ProbeError::Command(format!("failed to start '{}': {}", self.config.program, e))
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.config.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ProbeError::Timeout(format!(
                    "'{}' did not finish within {:?}",
                    self.config.display(),
                    self.config.timeout
                ))
            })??;
        let elapsed = started.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let status = output
                .status
                .code()
                .map(|code| format!("exit code {}", code))
                .unwrap_or_else(|| "terminated by signal".to_string());
            tracing::debug!(%status, ?elapsed, "migration command failed");
            return Err(ProbeError::Command(format!(
                "{}: {}",
                status,
                stderr_tail(&stderr, STDERR_TAIL_LINES)
            )));
        }

        tracing::debug!(?elapsed, "migration command succeeded");
        Ok(CommandOutput {
            stdout,
            stderr,
            elapsed,
        })
    }
}

/// Last `lines` non-empty lines of `stderr`, joined with " | "
pub(crate) fn stderr_tail(stderr: &str, lines: usize) -> String {
    let kept: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if kept.is_empty() {
        return "no error output".to_string();
    }
    kept[kept.len().saturating_sub(lines)..].join(" | ")
}
