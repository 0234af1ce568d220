//! Error types for the effect pipeline

use crate::effect::EffectKind;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while staging or running effects
///
/// Out-of-range effect parameters are not represented here: the validator
/// skips those effects silently.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source file does not exist
    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),

    /// Source exists but is not a readable regular file
    #[error("Source file is not readable: {path}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Source paths must be absolute; resolution belongs to the caller
    #[error("Source path must be absolute: {0}")]
    RelativeSource(PathBuf),

    /// Base copy of the source into the working file failed
    #[error("Failed to copy {from} to working file {to}")]
    CopyFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// External tool could not be started
    #[error("Failed to launch {tool}")]
    ToolLaunchFailure {
        tool: PathBuf,
        #[source]
        source: io::Error,
    },

    /// External tool ran and exited unsuccessfully
    #[error("Tool exited with status {code:?}")]
    ToolExitFailure {
        /// `None` when the process was terminated by a signal
        code: Option<i32>,
        diagnostics: String,
    },

    /// IO failure while supervising a running tool
    #[error("IO error while running {tool}")]
    ToolIo {
        tool: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Tool reported success but produced no usable output
    #[error("Tool reported success but output is missing or empty: {0}")]
    MissingOutput(PathBuf),

    /// Stage exceeded the configured time limit and was killed
    #[error("Stage timed out after {0:?}")]
    StageTimedOut(Duration),

    /// Caller cancelled the run
    #[error("Pipeline cancelled")]
    Cancelled,

    /// Delete-then-rename of a staged output failed
    #[error("Failed to promote {staged} to {working}")]
    PromoteFailure {
        staged: PathBuf,
        working: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Arguments were requested for an effect without its parameters
    #[error("Missing parameters for effect: {0}")]
    InvalidParameters(EffectKind),

    /// Effect name does not match any known effect
    #[error("Unknown effect: {0}")]
    UnknownEffect(String),

    /// Pipeline configuration is inconsistent
    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// Whether this error was caused by the caller's input rather than by
    /// the pipeline or the external tool
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound(_)
                | Self::SourceUnreadable { .. }
                | Self::RelativeSource(_)
                | Self::UnknownEffect(_)
        )
    }

    /// Whether the failure came from running the external tool
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            Self::ToolLaunchFailure { .. }
                | Self::ToolExitFailure { .. }
                | Self::ToolIo { .. }
                | Self::MissingOutput(_)
                | Self::StageTimedOut(_)
        )
    }

    /// Captured tool output, when the failure carries any
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::ToolExitFailure { diagnostics, .. } => Some(diagnostics.as_str()),
            _ => None,
        }
    }

    /// Captured tool output, or this error and its causes joined with `": "`
    pub fn detail(&self) -> String {
        if let Some(diagnostics) = self.diagnostics() {
            return diagnostics.to_string();
        }
        let mut detail = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            detail.push_str(": ");
            detail.push_str(&err.to_string());
            cause = err.source();
        }
        detail
    }
}

/// Terminal failure of one pipeline run
///
/// The working file on disk reflects exactly `committed`, the effects
/// promoted during this run before `error` occurred.
#[derive(Error, Debug)]
#[error("Effect pipeline failed after {} committed effect(s)", .committed.len())]
pub struct PipelineFailure {
    #[source]
    pub error: PipelineError,
    /// Effect whose stage failed, `None` if the run failed before any stage
    pub failed: Option<EffectKind>,
    pub committed: Vec<EffectKind>,
    /// Working file path, `None` if it was never created or is gone after a
    /// failed promote
    pub working_file: Option<PathBuf>,
}

impl PipelineFailure {
    pub(crate) fn before_staging(error: PipelineError) -> Self {
        Self {
            error,
            failed: None,
            committed: Vec::new(),
            working_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_bad_input_classification() {
        assert!(PipelineError::SourceNotFound(PathBuf::from("/a.wav")).is_bad_input());
        assert!(PipelineError::UnknownEffect("reverb".to_string()).is_bad_input());
        assert!(!PipelineError::Cancelled.is_bad_input());

        let exit = PipelineError::ToolExitFailure {
            code: Some(1),
            diagnostics: "Invalid argument".to_string(),
        };
        assert!(!exit.is_bad_input());
        assert!(exit.is_tool_failure());
        assert_eq!(exit.diagnostics(), Some("Invalid argument"));
    }

    #[test]
    fn test_detail_includes_cause() {
        let launch = PipelineError::ToolLaunchFailure {
            tool: PathBuf::from("ffmpeg"),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };
        assert_eq!(
            launch.detail(),
            "Failed to launch ffmpeg: No such file or directory"
        );

        let exit = PipelineError::ToolExitFailure {
            code: Some(1),
            diagnostics: "Invalid argument".to_string(),
        };
        assert_eq!(exit.detail(), "Invalid argument");
    }

    #[test]
    fn test_failure_exposes_source() {
        let failure = PipelineFailure {
            error: PipelineError::Cancelled,
            failed: Some(EffectKind::Pitch),
            committed: vec![EffectKind::Denoise],
            working_file: None,
        };
        assert_eq!(
            failure.to_string(),
            "Effect pipeline failed after 1 committed effect(s)"
        );
        assert!(failure.source().is_some());
    }
}
