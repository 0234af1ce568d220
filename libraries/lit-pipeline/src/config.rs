//! Pipeline configuration
use crate::error::{PipelineError, Result};
use crate::staging::StagingConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Default external tool, resolved through `PATH`
pub const DEFAULT_TOOL: &str = "ffmpeg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// External audio tool invoked once per stage
    pub tool_path: PathBuf,
    /// Per-stage limit; the tool is killed when it is exceeded
    pub stage_timeout: Option<Duration>,
    pub staging: StagingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tool_path: PathBuf::from(DEFAULT_TOOL),
            stage_timeout: None,
            staging: StagingConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tool_path.as_os_str().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "tool_path is empty".to_string(),
            ));
        }
        if self.stage_timeout.is_some_and(|t| t.is_zero()) {
            return Err(PipelineError::InvalidConfig(
                "stage_timeout must be greater than zero".to_string(),
            ));
        }
        self.staging.validate()
    }
}
