/// Processing service - runs the effect pipeline for client requests
use crate::{
    config::ServerConfig,
    error::{Result, ServerError},
    services::{FileLocks, PathResolver},
};
use lit_pipeline::{
    CancellationToken, EffectKind, EffectPipeline, ProcessLauncher, ToolLauncher,
    TransformRequest, WorkingState,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Tool launcher chosen at startup
pub type SharedLauncher = Arc<dyn ToolLauncher>;

/// Result of one processing request
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// Public URL of the working file
    pub url: String,
    pub working_file: PathBuf,
    pub initial_state: WorkingState,
    pub applied: Vec<EffectKind>,
    pub skipped: Vec<EffectKind>,
}

/// Whether a source already has a working file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopyStatus {
    pub exists: bool,
    pub url: Option<String>,
}

pub struct ProcessingService {
    pipeline: EffectPipeline<SharedLauncher>,
    resolver: PathResolver,
    locks: FileLocks,
}

impl ProcessingService {
    /// Service that runs the configured ffmpeg binary
    pub fn new(config: &ServerConfig) -> Result<Self> {
        Self::with_launcher(config, Arc::new(ProcessLauncher))
    }

    pub fn with_launcher(config: &ServerConfig, launcher: SharedLauncher) -> Result<Self> {
        let pipeline = EffectPipeline::with_launcher(config.to_pipeline_config(), launcher)
            .map_err(|e| ServerError::Config(e.to_string()))?;
        let resolver = PathResolver::new(
            config.storage.audio_dir.clone(),
            config.storage.public_base_url.clone(),
        );

        Ok(Self {
            pipeline,
            resolver,
            locks: FileLocks::new(),
        })
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Apply `request` to the file named by `reference`
    ///
    /// Runs against the same working file are serialized. The run is detached
    /// from the caller: dropping the returned future does not stop it, only
    /// `cancel` does.
    pub async fn process(
        self: &Arc<Self>,
        reference: &str,
        request: &TransformRequest,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome> {
        let source = self.resolver.resolve(reference)?;

        let service = Arc::clone(self);
        let request = request.clone();
        let cancel = cancel.clone();
        let run = tokio::spawn(async move { service.run_locked(source, request, cancel).await });

        run.await
            .map_err(|e| ServerError::Internal(format!("Processing task failed: {}", e)))?
    }

    async fn run_locked(
        &self,
        source: PathBuf,
        request: TransformRequest,
        cancel: CancellationToken,
    ) -> Result<ProcessOutcome> {
        let working_path = self.pipeline.working_path(&source);

        let _guard = tokio::select! {
            guard = self.locks.lock(&working_path) => guard,
            () = cancel.cancelled() => return Err(ServerError::Cancelled),
        };

        let report = self
            .pipeline
            .process_with_cancel(&source, &request, &cancel)
            .await?;

        Ok(ProcessOutcome {
            url: self.resolver.public_url(&report.working_file)?,
            working_file: report.working_file,
            initial_state: report.initial_state,
            applied: report.applied,
            skipped: report.skipped,
        })
    }

    /// Look up the working file for `reference` without creating it
    pub fn working_copy(&self, reference: &str) -> Result<WorkingCopyStatus> {
        let source = self.resolver.resolve(reference)?;
        if !self.pipeline.has_working_copy(&source) {
            return Ok(WorkingCopyStatus {
                exists: false,
                url: None,
            });
        }

        let url = self
            .resolver
            .public_url(&self.pipeline.working_path(&source))?;
        Ok(WorkingCopyStatus {
            exists: true,
            url: Some(url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(audio_dir: PathBuf) -> Arc<ProcessingService> {
        let mut config = ServerConfig::default();
        config.storage.audio_dir = audio_dir;
        Arc::new(ProcessingService::new(&config).unwrap())
    }

    #[test]
    fn test_working_copy_status() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(temp_dir.path().to_path_buf());

        let status = service.working_copy("clip.wav").unwrap();
        assert_eq!(
            status,
            WorkingCopyStatus {
                exists: false,
                url: None
            }
        );

        std::fs::write(temp_dir.path().join("clip_denoised.wav"), b"audio").unwrap();
        let status = service
            .working_copy("http://localhost:8080/files/clip.wav")
            .unwrap();
        assert!(status.exists);
        assert_eq!(
            status.url.as_deref(),
            Some("http://localhost:8080/files/clip_denoised.wav")
        );
    }

    #[tokio::test]
    async fn test_empty_request_only_copies() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("clip.wav"), b"audio").unwrap();
        let service = service(temp_dir.path().to_path_buf());

        let outcome = service
            .process("clip.wav", &TransformRequest::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.initial_state, WorkingState::Copied);
        assert!(outcome.applied.is_empty());
        assert_eq!(
            outcome.url,
            "http://localhost:8080/files/clip_denoised.wav"
        );
    }

    #[test]
    fn test_invalid_pipeline_settings_fail_construction() {
        let mut config = ServerConfig::default();
        config.processing.working_suffix = "bad.suffix".to_string();
        assert!(matches!(
            ProcessingService::new(&config),
            Err(ServerError::Config(_))
        ));
    }
}
