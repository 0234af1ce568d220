//! Pipeline orchestrator
//!
//! Runs the base copy, then each applicable effect in fixed order. Every
//! stage reads the previously promoted working file and writes a temporary
//! sibling; only a promoted output changes the working file. The first
//! failure stops the run and the working file keeps the committed prefix.

use crate::config::PipelineConfig;
use crate::effect::{EffectKind, TransformRequest};
use crate::error::{PipelineError, PipelineFailure, Result};
use crate::filter::build_args;
use crate::runner::{ProcessLauncher, StageRunner, ToolLauncher};
use crate::staging::{StagingManager, WorkingFile, WorkingState};
use crate::validate::is_applicable;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_util::sync::CancellationToken;

/// Successful outcome of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub working_file: PathBuf,
    /// Whether the run created the working file or reused an existing one
    pub initial_state: WorkingState,
    /// Effects promoted during this run, in order
    pub applied: Vec<EffectKind>,
    /// Effects skipped because their parameters were absent or out of range
    pub skipped: Vec<EffectKind>,
}

/// The effect pipeline engine
pub struct EffectPipeline<L = ProcessLauncher> {
    staging: StagingManager,
    runner: StageRunner<L>,
}

impl EffectPipeline<ProcessLauncher> {
    /// Pipeline that runs the configured tool as a child process
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_launcher(config, ProcessLauncher)
    }
}

impl<L: ToolLauncher> EffectPipeline<L> {
    pub fn with_launcher(config: PipelineConfig, launcher: L) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            staging: StagingManager::new(config.staging),
            runner: StageRunner::new(launcher, config.tool_path).with_timeout(config.stage_timeout),
        })
    }

    pub fn staging(&self) -> &StagingManager {
        &self.staging
    }

    /// Whether a working file already exists for this source
    pub fn has_working_copy(&self, source: &Path) -> bool {
        self.staging.has_working_copy(source)
    }

    pub fn working_path(&self, source: &Path) -> PathBuf {
        self.staging.working_path(source)
    }

    /// Stage order for a request: denoise first when asked for, then the gated effects
    pub fn plan(request: &TransformRequest) -> Vec<EffectKind> {
        let mut plan = Vec::with_capacity(EffectKind::GATED_ORDER.len() + 1);
        if request.denoise {
            plan.push(EffectKind::Denoise);
        }
        plan.extend(EffectKind::GATED_ORDER);
        plan
    }

    /// Apply `request` to the working file for `source`
    pub async fn process(
        &self,
        source: &Path,
        request: &TransformRequest,
    ) -> std::result::Result<PipelineReport, PipelineFailure> {
        self.process_with_cancel(source, request, &CancellationToken::new())
            .await
    }

    /// Like [`process`](Self::process), stopping early when `cancel` fires
    ///
    /// A running tool is killed on cancellation and its output discarded.
    /// Dropping the returned future also removes any temporary output.
    pub async fn process_with_cancel(
        &self,
        source: &Path,
        request: &TransformRequest,
        cancel: &CancellationToken,
    ) -> std::result::Result<PipelineReport, PipelineFailure> {
        tracing::info!("Processing {}", source.display());

        check_source(source)
            .await
            .map_err(PipelineFailure::before_staging)?;

        // Removes the temporary sibling if this future is dropped mid-run
        let mut staged = StagedOutput::new(self.staging.temp_path(source));

        let mut working = self
            .staging
            .ensure_working_copy(source)
            .await
            .map_err(PipelineFailure::before_staging)?;
        let initial_state = working.state();
        let mut skipped = Vec::new();

        for effect in Self::plan(request) {
            if !is_applicable(effect, request) {
                tracing::debug!("Skipping {}: parameters absent or out of range", effect);
                skipped.push(effect);
                continue;
            }

            let step = if cancel.is_cancelled() {
                Err(PipelineError::Cancelled)
            } else {
                self.apply_effect(effect, request, &working, staged.path(), cancel)
                    .await
            };

            let step = match step {
                Err(error @ PipelineError::PromoteFailure { .. }) => self
                    .staging
                    .restore(staged.path(), &working, effect)
                    .await
                    .ok_or(error),
                other => other,
            };

            match step {
                Ok(next) => {
                    tracing::info!("Applied {} to {}", effect, next.path().display());
                    working = next;
                }
                Err(error) => {
                    tracing::warn!("Stage {} failed for {}: {}", effect, source.display(), error);
                    if matches!(error, PipelineError::PromoteFailure { .. }) {
                        // The staged output may be the only copy left
                        staged.keep();
                    } else {
                        self.staging.discard(staged.path()).await;
                    }
                    let working_file = fs::try_exists(working.path())
                        .await
                        .unwrap_or(false)
                        .then(|| working.path().to_path_buf());
                    return Err(PipelineFailure {
                        error,
                        failed: Some(effect),
                        committed: working.applied().to_vec(),
                        working_file,
                    });
                }
            }
        }

        let applied = working.applied().to_vec();
        tracing::info!(
            "Finished {}: {} applied, {} skipped",
            source.display(),
            applied.len(),
            skipped.len()
        );

        Ok(PipelineReport {
            working_file: working.into_path(),
            initial_state,
            applied,
            skipped,
        })
    }

    async fn apply_effect(
        &self,
        effect: EffectKind,
        request: &TransformRequest,
        working: &WorkingFile,
        staged: &Path,
        cancel: &CancellationToken,
    ) -> Result<WorkingFile> {
        let args = build_args(effect, request)?;
        let output = self
            .runner
            .run(working.path(), &args, staged, cancel)
            .await?;
        self.staging.promote(&output.path, working, effect).await
    }
}

/// Temporary stage output path, removed on drop unless kept
struct StagedOutput {
    path: PathBuf,
    keep: bool,
}

impl StagedOutput {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for StagedOutput {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed abandoned stage output {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove stage output {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// The source must be an absolute path to a readable regular file
async fn check_source(source: &Path) -> Result<()> {
    if !source.is_absolute() {
        return Err(PipelineError::RelativeSource(source.to_path_buf()));
    }

    let metadata = match fs::metadata(source).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(PipelineError::SourceNotFound(source.to_path_buf()));
        }
        Err(e) => {
            return Err(PipelineError::SourceUnreadable {
                path: source.to_path_buf(),
                source: e,
            });
        }
    };

    if !metadata.is_file() {
        return Err(PipelineError::SourceUnreadable {
            path: source.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }

    fs::File::open(source)
        .await
        .map_err(|e| PipelineError::SourceUnreadable {
            path: source.to_path_buf(),
            source: e,
        })?;

    Ok(())
}
