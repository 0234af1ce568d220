//! Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use lit_pipeline::{CancellationToken, PipelineError, ToolCommand, ToolLauncher, ToolOutput};
use lit_server::{api, config::ServerConfig, services::ProcessingService, state::AppState};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Stand-in for ffmpeg: appends `|<filter expression>` to the input bytes
#[derive(Default)]
pub struct EchoLauncher {
    pub fail_on: Option<&'static str>,
    pub stall_on: Option<&'static str>,
    pub calls: Mutex<Vec<String>>,
}

impl EchoLauncher {
    pub fn failing_on(prefix: &'static str) -> Self {
        Self {
            fail_on: Some(prefix),
            ..Self::default()
        }
    }

    /// Leave partial output and keep running until cancelled
    pub fn stalling_on(prefix: &'static str) -> Self {
        Self {
            stall_on: Some(prefix),
            ..Self::default()
        }
    }

    pub fn expressions(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolLauncher for EchoLauncher {
    async fn launch(
        &self,
        command: &ToolCommand,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, PipelineError> {
        let expr = command.args[4].to_string_lossy().into_owned();
        self.calls.lock().unwrap().push(expr.clone());

        if self.fail_on.is_some_and(|prefix| expr.starts_with(prefix)) {
            return Ok(ToolOutput {
                exit_code: Some(1),
                success: false,
                diagnostics: format!("Invalid argument: {}", expr),
            });
        }

        let input = PathBuf::from(&command.args[2]);
        let output = PathBuf::from(command.args.last().unwrap());

        if self.stall_on.is_some_and(|prefix| expr.starts_with(prefix)) {
            tokio::fs::write(&output, b"partial").await.unwrap();
            cancel.cancelled().await;
            return Err(PipelineError::Cancelled);
        }

        let mut bytes = tokio::fs::read(&input).await.unwrap();
        bytes.push(b'|');
        bytes.extend_from_slice(expr.as_bytes());
        tokio::fs::write(&output, bytes).await.unwrap();

        Ok(ToolOutput {
            exit_code: Some(0),
            success: true,
            diagnostics: String::new(),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub audio_dir: TempDir,
    pub launcher: Arc<EchoLauncher>,
    pub shutdown: CancellationToken,
}

impl TestApp {
    pub fn new(launcher: EchoLauncher) -> Self {
        let audio_dir = TempDir::new().unwrap();
        let mut config = ServerConfig::default();
        config.storage.audio_dir = audio_dir.path().to_path_buf();

        let launcher = Arc::new(launcher);
        let processing =
            ProcessingService::with_launcher(&config, Arc::clone(&launcher) as _).unwrap();
        let shutdown = CancellationToken::new();
        let app_state = AppState::new(Arc::new(processing), shutdown.clone());

        Self {
            router: api::router(app_state),
            audio_dir,
            launcher,
            shutdown,
        }
    }

    pub fn write_audio(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.audio_dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn read_audio(&self, name: &str) -> String {
        String::from_utf8(std::fs::read(self.audio_dir.path().join(name)).unwrap()).unwrap()
    }
}
