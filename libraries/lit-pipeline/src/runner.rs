//! Stage runner - one external tool invocation per effect
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Program plus arguments for one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    /// Space-joined command line, for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(|arg| arg.as_os_str()))
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of a tool process that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub success: bool,
    /// stdout followed by stderr
    pub diagnostics: String,
}

/// Capability to run an external tool
///
/// Implementations must terminate the process (not just stop waiting for
/// it) when `cancel` fires, and then return [`PipelineError::Cancelled`].
#[async_trait]
pub trait ToolLauncher: Send + Sync {
    async fn launch(&self, command: &ToolCommand, cancel: &CancellationToken)
        -> Result<ToolOutput>;
}

/// Shared launchers, so one launcher can back several pipelines or be
/// chosen at runtime as `Arc<dyn ToolLauncher>`
#[async_trait]
impl<T: ToolLauncher + ?Sized> ToolLauncher for Arc<T> {
    async fn launch(
        &self,
        command: &ToolCommand,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput> {
        (**self).launch(command, cancel).await
    }
}

/// Launches tools as child processes via `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

#[async_trait]
impl ToolLauncher for ProcessLauncher {
    async fn launch(
        &self,
        command: &ToolCommand,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PipelineError::ToolLaunchFailure {
                tool: command.program.clone(),
                source,
            })?;

        // Drain both pipes concurrently so a chatty tool never blocks on a full pipe
        let stdout = tokio::spawn(read_stream(child.stdout.take()));
        let stderr = tokio::spawn(read_stream(child.stderr.take()));

        let status = tokio::select! {
            status = child.wait() => status.map_err(|source| PipelineError::ToolIo {
                tool: command.program.clone(),
                source,
            })?,
            () = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill {}: {}", command.program.display(), e);
                }
                return Err(PipelineError::Cancelled);
            }
        };

        let mut diagnostics = stdout.await.unwrap_or_default();
        diagnostics.push_str(&stderr.await.unwrap_or_default());

        Ok(ToolOutput {
            exit_code: status.code(),
            success: status.success(),
            diagnostics,
        })
    }
}

async fn read_stream<R>(stream: Option<R>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        // A read error just truncates the diagnostics
        let _ = stream.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// A stage output that exists and is non-empty, ready to promote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    pub path: PathBuf,
    pub bytes: u64,
    pub diagnostics: String,
}

/// Runs one effect stage: `tool -y -i <input> <effect args> <output>`
#[derive(Debug, Clone)]
pub struct StageRunner<L> {
    launcher: L,
    tool: PathBuf,
    stage_timeout: Option<Duration>,
}

impl<L: ToolLauncher> StageRunner<L> {
    pub fn new(launcher: L, tool: impl Into<PathBuf>) -> Self {
        Self {
            launcher,
            tool: tool.into(),
            stage_timeout: None,
        }
    }

    /// Kill any stage that runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn tool(&self) -> &Path {
        &self.tool
    }

    pub fn command(&self, input: &Path, effect_args: &[String], output: &Path) -> ToolCommand {
        let mut args: Vec<OsString> = Vec::with_capacity(effect_args.len() + 4);
        // -y: overwrite a stale output from an earlier run
        args.push("-y".into());
        args.push("-i".into());
        args.push(input.as_os_str().to_owned());
        args.extend(effect_args.iter().map(OsString::from));
        args.push(output.as_os_str().to_owned());

        ToolCommand {
            program: self.tool.clone(),
            args,
        }
    }

    /// Run a single stage, writing to `output`
    ///
    /// Never retries. On success the output file is verified to exist and be
    /// non-empty.
    pub async fn run(
        &self,
        input: &Path,
        effect_args: &[String],
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<StageOutput> {
        let command = self.command(input, effect_args, output);
        tracing::debug!("Running stage: {}", command.display());

        let stage_token = cancel.child_token();
        let launch = self.launcher.launch(&command, &stage_token);
        tokio::pin!(launch);

        let result = match self.stage_timeout {
            None => launch.await,
            Some(limit) => tokio::select! {
                result = &mut launch => result,
                () = tokio::time::sleep(limit) => {
                    stage_token.cancel();
                    // Let the launcher kill and reap the process before reporting
                    let _ = launch.await;
                    return Err(PipelineError::StageTimedOut(limit));
                }
            },
        };

        let tool_output = result?;
        if !tool_output.success {
            return Err(PipelineError::ToolExitFailure {
                code: tool_output.exit_code,
                diagnostics: tool_output.diagnostics,
            });
        }

        // The tool's own success report is not trusted on its own
        let bytes = match tokio::fs::metadata(output).await {
            Ok(metadata) if metadata.is_file() && metadata.len() > 0 => metadata.len(),
            _ => return Err(PipelineError::MissingOutput(output.to_path_buf())),
        };

        Ok(StageOutput {
            path: output.to_path_buf(),
            bytes,
            diagnostics: tool_output.diagnostics,
        })
    }
}
