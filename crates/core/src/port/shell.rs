// Shell Port
// Abstraction for running command strings through the platform interpreter

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Runtime reported when a command was not timed (or was a dry run)
pub const UNTIMED: f64 = -1.0;

/// A command string plus how to run it
#[derive(Debug, Clone, PartialEq)]
pub struct ShellCommand {
    pub command: String,
    /// Directory the command runs in; inherits the process directory when None
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub dry_run: bool,
    pub timed: bool,
}

impl ShellCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
            env: Vec::new(),
            dry_run: false,
            timed: false,
        }
    }

    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn timed(mut self, timed: bool) -> Self {
        self.timed = timed;
        self
    }

    /// grep-style filters exit with 1 on "no match"; that is not a failure
    pub fn is_tolerated_exit(&self, exit_code: Option<i32>) -> bool {
        exit_code == Some(1) && self.command.contains("grep ")
    }
}

/// Output of a finished command
#[derive(Debug, Clone, PartialEq)]
pub struct ShellOutput {
    pub stdout: String,
    /// Wall time in seconds, or `UNTIMED`
    pub runtime_secs: f64,
}

impl ShellOutput {
    pub fn dry() -> Self {
        Self {
            stdout: String::new(),
            runtime_secs: UNTIMED,
        }
    }

    /// Tolerated "no match" exit
    pub fn no_match() -> Self {
        Self {
            stdout: String::new(),
            runtime_secs: 0.0,
        }
    }
}

/// Shell errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShellError {
    #[error("Spawn failed for '{command}': {reason}")]
    SpawnFailed { command: String, reason: String },

    #[error("Running command '{command}' did not succeed (exit {exit_code:?}): {stderr}")]
    Failed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("IO error: {0}")]
    IoError(String),
}

/// Shell executor trait
///
/// Implementations:
/// - SystemShell: `sh -c` via tokio::process
/// - RecordingShell: records commands (tests)
#[async_trait]
pub trait ShellExecutor: Send + Sync {
    /// Run a command to completion
    ///
    /// # Errors
    /// - ShellError::SpawnFailed if the interpreter cannot be started
    /// - ShellError::Failed on non-zero exit, with captured stderr
    async fn run(&self, command: &ShellCommand) -> Result<ShellOutput, ShellError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every command; fails those containing a configured pattern
    #[derive(Default, Clone)]
    pub struct RecordingShell {
        calls: Arc<Mutex<Vec<ShellCommand>>>,
        fail_patterns: Arc<Mutex<Vec<String>>>,
        stdout: Arc<Mutex<String>>,
    }

    impl RecordingShell {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_on(self, pattern: impl Into<String>) -> Self {
            self.fail_patterns.lock().unwrap().push(pattern.into());
            self
        }

        pub fn with_stdout(self, stdout: impl Into<String>) -> Self {
            *self.stdout.lock().unwrap() = stdout.into();
            self
        }

        pub fn calls(&self) -> Vec<ShellCommand> {
            self.calls.lock().unwrap().clone()
        }

        pub fn commands(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.command).collect()
        }
    }

    #[async_trait]
    impl ShellExecutor for RecordingShell {
        async fn run(&self, command: &ShellCommand) -> Result<ShellOutput, ShellError> {
            self.calls.lock().unwrap().push(command.clone());

            if command.dry_run {
                return Ok(ShellOutput::dry());
            }

            let failing = self
                .fail_patterns
                .lock()
                .unwrap()
                .iter()
                .any(|p| command.command.contains(p.as_str()));
            if failing {
                return Err(ShellError::Failed {
                    command: command.command.clone(),
                    exit_code: Some(2),
                    stderr: "mock failure".to_string(),
                });
            }

            Ok(ShellOutput {
                stdout: self.stdout.lock().unwrap().clone(),
                runtime_secs: if command.timed { 0.0 } else { UNTIMED },
            })
        }
    }
}
