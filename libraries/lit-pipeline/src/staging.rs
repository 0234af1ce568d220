//! File staging - the canonical working file and atomic promotion
//!
//! Each source gets exactly one working file next to it. Stage outputs go to
//! a temporary sibling and only become real through [`StagingManager::promote`].

use crate::effect::EffectKind;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Suffix marking the canonical working variant of a source
pub const DEFAULT_WORKING_SUFFIX: &str = "_denoised";

/// Suffix for a stage's temporary output
pub const DEFAULT_TEMP_SUFFIX: &str = "_denoised_temp";

/// Naming conventions for working and temporary files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingConfig {
    pub working_suffix: String,
    pub temp_suffix: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            working_suffix: DEFAULT_WORKING_SUFFIX.to_string(),
            temp_suffix: DEFAULT_TEMP_SUFFIX.to_string(),
        }
    }
}

impl StagingConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, suffix) in [
            ("working_suffix", &self.working_suffix),
            ("temp_suffix", &self.temp_suffix),
        ] {
            if suffix.is_empty() {
                return Err(PipelineError::InvalidConfig(format!("{} is empty", name)));
            }
            if suffix.contains(['/', '\\', '.']) {
                return Err(PipelineError::InvalidConfig(format!(
                    "{} may not contain path separators or dots: {:?}",
                    name, suffix
                )));
            }
        }
        if self.working_suffix == self.temp_suffix {
            return Err(PipelineError::InvalidConfig(
                "working_suffix and temp_suffix must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where a working file is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "effect")]
pub enum WorkingState {
    /// Freshly copied from the source during this run
    Copied,
    /// Already existed from an earlier run
    Reused,
    /// Last transition was a promoted stage for this effect
    Applied(EffectKind),
}

/// The canonical working file, as seen by one pipeline run
///
/// Values are immutable: [`StagingManager::promote`] is the only way to get
/// the next state, and a failed promote leaves the caller holding the
/// previous, still valid, value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingFile {
    path: PathBuf,
    state: WorkingState,
    applied: Vec<EffectKind>,
}

impl WorkingFile {
    fn new(path: PathBuf, state: WorkingState) -> Self {
        Self {
            path,
            state,
            applied: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> WorkingState {
        self.state
    }

    /// Effects promoted into this file during the current run, in order
    pub fn applied(&self) -> &[EffectKind] {
        &self.applied
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    fn advance(&self, effect: EffectKind) -> Self {
        let mut applied = self.applied.clone();
        applied.push(effect);
        Self {
            path: self.path.clone(),
            state: WorkingState::Applied(effect),
            applied,
        }
    }
}

/// Owns working-file naming, creation and promotion
#[derive(Debug, Clone, Default)]
pub struct StagingManager {
    config: StagingConfig,
}

impl StagingManager {
    pub fn new(config: StagingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StagingConfig {
        &self.config
    }

    /// Canonical working path for a source
    ///
    /// `clip.wav` maps to `clip_denoised.wav`. A source that already is a
    /// working file maps to itself.
    pub fn working_path(&self, source: &Path) -> PathBuf {
        self.variant_path(source, &self.config.working_suffix)
    }

    /// Temporary output path for stages run against a source
    ///
    /// Derived from the source name, so runs on different sources never
    /// share a temp file.
    pub fn temp_path(&self, source: &Path) -> PathBuf {
        self.variant_path(source, &self.config.temp_suffix)
    }

    /// Whether a working file already exists for this source
    pub fn has_working_copy(&self, source: &Path) -> bool {
        self.working_path(source).is_file()
    }

    /// Return the existing working file, or create it as a byte copy of the source
    pub async fn ensure_working_copy(&self, source: &Path) -> Result<WorkingFile> {
        let working = self.working_path(source);

        if fs::metadata(&working).await.is_ok_and(|m| m.is_file()) {
            tracing::debug!("Reusing working file {}", working.display());
            return Ok(WorkingFile::new(working, WorkingState::Reused));
        }

        // Copy beside the working path and rename, so an interrupted copy is
        // never found at the working path
        let partial = self.temp_path(source);
        let copied = match fs::copy(source, &partial).await {
            Ok(_) => fs::rename(&partial, &working).await,
            Err(e) => Err(e),
        };
        if let Err(e) = copied {
            self.discard(&partial).await;
            return Err(PipelineError::CopyFailure {
                from: source.to_path_buf(),
                to: working,
                source: e,
            });
        }

        tracing::info!(
            "Created working file {} from {}",
            working.display(),
            source.display()
        );
        Ok(WorkingFile::new(working, WorkingState::Copied))
    }

    /// Replace the working file with a staged stage output
    ///
    /// Deletes the current working file, then renames `staged` into its
    /// place. On error `staged` is left as it was; if the working file is
    /// already gone, [`restore`](Self::restore) can still move it in.
    pub async fn promote(
        &self,
        staged: &Path,
        working: &WorkingFile,
        effect: EffectKind,
    ) -> Result<WorkingFile> {
        let promote_failure = |source| PipelineError::PromoteFailure {
            staged: staged.to_path_buf(),
            working: working.path().to_path_buf(),
            source,
        };

        // Check the staged output first so a bad promote never costs the working file
        fs::metadata(staged).await.map_err(promote_failure)?;

        match fs::remove_file(working.path()).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(promote_failure(e)),
        }
        fs::rename(staged, working.path())
            .await
            .map_err(promote_failure)?;

        tracing::debug!("Promoted {} into {}", effect, working.path().display());
        Ok(working.advance(effect))
    }

    /// Put `staged` back at the working path after a promote lost the working file
    ///
    /// Returns the advanced working file when the rename succeeds, `None` when
    /// the working path still exists or the staged output cannot be moved.
    pub async fn restore(
        &self,
        staged: &Path,
        working: &WorkingFile,
        effect: EffectKind,
    ) -> Option<WorkingFile> {
        if fs::symlink_metadata(working.path()).await.is_ok()
            || fs::metadata(staged).await.is_err()
        {
            return None;
        }

        match fs::rename(staged, working.path()).await {
            Ok(()) => {
                tracing::warn!(
                    "Restored {} into {} after a failed promote",
                    effect,
                    working.path().display()
                );
                Some(working.advance(effect))
            }
            Err(e) => {
                tracing::error!(
                    "Working file {} is missing; {} output kept at {}: {}",
                    working.path().display(),
                    effect,
                    staged.display(),
                    e
                );
                None
            }
        }
    }

    /// Remove an unpromoted stage output, if any
    pub async fn discard(&self, staged: &Path) {
        match fs::remove_file(staged).await {
            Ok(()) => tracing::debug!("Discarded staged output {}", staged.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to discard staged output {}: {}",
                staged.display(),
                e
            ),
        }
    }

    fn variant_path(&self, source: &Path, suffix: &str) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = stem
            .strip_suffix(self.config.working_suffix.as_str())
            .unwrap_or(&stem);

        let file_name = match source.extension() {
            Some(ext) => format!("{}{}.{}", base, suffix, ext.to_string_lossy()),
            None => format!("{}{}", base, suffix),
        };
        source.with_file_name(file_name)
    }
}
