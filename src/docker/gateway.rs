//! Runs host shell commands on behalf of the container controller.
//!
//! Commands are opaque `sh -c` strings. The gateway never fails: a command that
//! cannot be spawned yields an empty result with no exit code, and callers validate
//! the output they get back.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// How a command's output is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Inherit the terminal and block until the command exits.
    Wait,
    /// Capture combined output with one trailing newline trimmed.
    Single,
    /// Capture combined output untouched, for line-oriented parsing.
    Multiline,
}

/// Outcome of one gateway call. `output` is `None` for [`CaptureMode::Wait`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Combined stdout and stderr.
    pub output: Option<String>,
    /// Stdout alone, for commands whose answer must not mix with diagnostics.
    pub stdout: Option<String>,
    /// `None` when the command could not be spawned or was killed by a signal.
    pub exit_code: Option<i32>,
}

impl ExecutionResult {
    /// Output written entirely to stdout.
    pub fn captured(output: impl Into<String>, exit_code: i32) -> Self {
        let output = output.into();
        Self {
            stdout: Some(output.clone()),
            output: Some(output),
            exit_code: Some(exit_code),
        }
    }

    /// Output split across both streams; `output` is stdout followed by stderr.
    pub fn streams(stdout: impl Into<String>, stderr: &str, exit_code: i32) -> Self {
        let stdout = stdout.into();
        Self {
            output: Some(format!("{}{}", stdout, stderr)),
            stdout: Some(stdout),
            exit_code: Some(exit_code),
        }
    }

    pub fn waited(exit_code: i32) -> Self {
        Self {
            output: None,
            stdout: None,
            exit_code: Some(exit_code),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Captured text, or `""` when nothing was captured.
    pub fn text(&self) -> &str {
        self.output.as_deref().unwrap_or("")
    }

    /// Captured stdout, or `""` when nothing was captured.
    pub fn stdout(&self) -> &str {
        self.stdout.as_deref().unwrap_or("")
    }
}

#[async_trait]
pub trait CommandGateway: Send + Sync {
    async fn run(&self, command: &str, mode: CaptureMode) -> ExecutionResult;
}

/// Gateway backed by `sh -c` on the host.
#[derive(Debug, Clone, Default)]
pub struct ShellGateway;

#[async_trait]
impl CommandGateway for ShellGateway {
    async fn run(&self, command: &str, mode: CaptureMode) -> ExecutionResult {
        tracing::debug!("$ {}", command.trim());

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);

        match mode {
            CaptureMode::Wait => match cmd.status().await {
                Ok(status) => ExecutionResult {
                    exit_code: status.code(),
                    ..Default::default()
                },
                Err(e) => {
                    tracing::warn!("Failed to run command: {}", e);
                    ExecutionResult::default()
                }
            },
            CaptureMode::Single | CaptureMode::Multiline => {
                let output = cmd
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .output()
                    .await;

                match output {
                    Ok(out) => {
                        let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
                        let mut text = format!("{}{}", stdout, String::from_utf8_lossy(&out.stderr));
                        if mode == CaptureMode::Single && text.ends_with('\n') {
                            text.pop();
                        }
                        ExecutionResult {
                            output: Some(text),
                            stdout: Some(stdout),
                            exit_code: out.status.code(),
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to run command: {}", e);
                        ExecutionResult {
                            output: Some(String::new()),
                            stdout: Some(String::new()),
                            exit_code: None,
                        }
                    }
                }
            }
        }
    }
}
