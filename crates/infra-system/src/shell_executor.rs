// Shell executor implementation
// reason: tokio::process for async `sh -c` invocation, TimeProvider for timing
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

use pira_core::port::shell::UNTIMED;
use pira_core::port::{ShellCommand, ShellError, ShellExecutor, ShellOutput, TimeProvider};

/// Runs command strings through `sh -c`
pub struct SystemShell {
    time_provider: Arc<dyn TimeProvider>,
}

impl SystemShell {
    /// Create a new shell executor
    ///
    /// # Example
    /// ```ignore
    /// let shell = SystemShell::new(Arc::new(SystemTimeProvider));
    /// let out = shell.run(&ShellCommand::new("make").in_dir("/bench/astar")).await?;
    /// ```
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { time_provider }
    }

    async fn spawn_and_wait(&self, command: &ShellCommand) -> Result<std::process::Output, ShellError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&command.command)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| ShellError::SpawnFailed {
            command: command.command.clone(),
            reason: e.to_string(),
        })?;

        child
            .wait_with_output()
            .await
            .map_err(|e| ShellError::IoError(e.to_string()))
    }
}

#[async_trait]
impl ShellExecutor for SystemShell {
    async fn run(&self, command: &ShellCommand) -> Result<ShellOutput, ShellError> {
        if command.dry_run {
            info!(command = %command.command, "Dry run, not executing");
            return Ok(ShellOutput::dry());
        }

        let start_time = self.time_provider.now_millis();
        debug!(
            command = %command.command,
            working_dir = ?command.working_dir,
            "Starting shell command"
        );

        let output = self.spawn_and_wait(command).await?;
        let duration_ms = self.time_provider.now_millis() - start_time;
        let exit_code = output.status.code();

        if !output.status.success() {
            if command.is_tolerated_exit(exit_code) {
                debug!(command = %command.command, "Filter matched nothing, treating as success");
                return Ok(ShellOutput::no_match());
            }

            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                command = %command.command,
                exit_code = ?exit_code,
                duration_ms = %duration_ms,
                stderr = %stderr,
                "Shell command failed"
            );
            return Err(ShellError::Failed {
                command: command.command.clone(),
                exit_code,
                stderr,
            });
        }

        debug!(
            command = %command.command,
            duration_ms = %duration_ms,
            "Shell command completed"
        );

        Ok(ShellOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            runtime_secs: if command.timed {
                duration_ms as f64 / 1000.0
            } else {
                UNTIMED
            },
        })
    }
}
