//! Command Validator
//! Pipes the document into an external validator command (e.g. `openapi-spec-validator -`)

use crate::document::SpecDocument;
use crate::error::{Result, SpecloopError};
use crate::validation::traits::{DocumentValidator, ValidationOutcome};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Exit codes the shell uses when it could not run the command at all
const SHELL_NOT_EXECUTABLE: i32 = 126;
const SHELL_NOT_FOUND: i32 = 127;

/// Configuration for a command validator
#[derive(Debug, Clone)]
pub struct CommandConfig {
    /// The command to execute
    pub command: String,
    /// Environment variables to set
    pub env: Vec<(String, String)>,
    /// Timeout in milliseconds (default: 30000, 0 for none)
    pub timeout_ms: u64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            env: Vec::new(),
            timeout_ms: 30000,
        }
    }
}

impl CommandConfig {
    /// Create a new command config with the given command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Add an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the timeout in milliseconds
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }
}

/// Validator that runs a shell command with the document on stdin.
///
/// Exit 0 means valid; any other exit is an invalid document whose reason is
/// the command's stderr (or stdout). Failing to run the command at all, or
/// running out of time, is an error.
pub struct CommandValidator {
    config: CommandConfig,
    name: String,
}

impl CommandValidator {
    /// Create a new command validator
    pub fn new(name: impl Into<String>, config: CommandConfig) -> Self {
        Self {
            config,
            name: name.into(),
        }
    }

    /// Create a simple command validator with defaults
    pub fn simple(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self::new(name, CommandConfig::new(command))
    }

    /// Get the command
    pub fn command(&self) -> &str {
        &self.config.command
    }

    async fn execute(&self, input: &str) -> std::io::Result<std::process::Output> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.config.command);
        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take();

        // Feed stdin while waiting so a command that never reads cannot stall the write
        let run = async move {
            let write = async {
                if let Some(mut stdin) = stdin {
                    // The command may exit without reading its input
                    match stdin.write_all(input.as_bytes()).await {
                        Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                        _ => {}
                    }
                }
                Ok::<(), std::io::Error>(())
            };
            let (written, output) = tokio::join!(write, child.wait_with_output());
            written?;
            output
        };

        if self.config.timeout_ms == 0 {
            return run.await;
        }

        let timeout = tokio::time::Duration::from_millis(self.config.timeout_ms);
        match tokio::time::timeout(timeout, run).await {
            Ok(result) => result,
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("Command timed out after {}ms", self.config.timeout_ms),
            )),
        }
    }
}

#[async_trait]
impl DocumentValidator for CommandValidator {
    async fn validate(&self, document: &SpecDocument) -> Result<ValidationOutcome> {
        let output = self.execute(document.as_str()).await.map_err(|e| {
            SpecloopError::Unavailable(format!("Validator '{}' could not run: {}", self.name, e))
        })?;

        if output.status.success() {
            return Ok(ValidationOutcome::Valid);
        }

        let code = output.status.code();
        if matches!(code, Some(SHELL_NOT_EXECUTABLE) | Some(SHELL_NOT_FOUND)) {
            return Err(SpecloopError::Unavailable(format!(
                "Validator '{}' could not run: {}",
                self.name,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let reason = if !stderr.trim().is_empty() {
            stderr.trim().to_string()
        } else if !stdout.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            format!("Validator '{}' failed with exit code: {:?}", self.name, code)
        };
        Ok(ValidationOutcome::Invalid(reason))
    }

    fn description(&self) -> &str {
        &self.name
    }
}
