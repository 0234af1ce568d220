//! Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use lit_pipeline::{
    EffectPipeline, PipelineConfig, PipelineError, ToolCommand, ToolLauncher, ToolOutput,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// In-process stand-in for ffmpeg
///
/// Each stage writes `<input bytes>|<filter expression>` to the output, so the
/// final file content records which stages ran and in what order.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    calls: Arc<Mutex<Vec<ToolCommand>>>,
    fail_on: Option<&'static str>,
    no_output_on: Option<&'static str>,
    hang_on: Option<&'static str>,
    stall_on: Option<&'static str>,
    obstruct_on: Option<&'static str>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit non-zero for the stage whose filter expression starts with `prefix`
    pub fn failing_on(mut self, prefix: &'static str) -> Self {
        self.fail_on = Some(prefix);
        self
    }

    /// Exit zero without writing anything for the matching stage
    pub fn silent_on(mut self, prefix: &'static str) -> Self {
        self.no_output_on = Some(prefix);
        self
    }

    /// Block the matching stage until it is cancelled
    pub fn hanging_on(mut self, prefix: &'static str) -> Self {
        self.hang_on = Some(prefix);
        self
    }

    /// Write partial output for the matching stage, then never finish or
    /// observe cancellation
    pub fn stalling_on(mut self, prefix: &'static str) -> Self {
        self.stall_on = Some(prefix);
        self
    }

    /// Succeed for the matching stage, but leave a non-empty directory where
    /// its input was so the output cannot be promoted
    pub fn obstructing_on(mut self, prefix: &'static str) -> Self {
        self.obstruct_on = Some(prefix);
        self
    }

    pub fn calls(&self) -> Vec<ToolCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// Filter expressions of every launched stage, in order
    pub fn expressions(&self) -> Vec<String> {
        self.calls().iter().map(expression).collect()
    }
}

fn expression(command: &ToolCommand) -> String {
    command.args[4].to_string_lossy().into_owned()
}

fn matches(prefix: Option<&'static str>, expr: &str) -> bool {
    prefix.is_some_and(|p| expr.starts_with(p))
}

#[async_trait]
impl ToolLauncher for FakeLauncher {
    async fn launch(
        &self,
        command: &ToolCommand,
        cancel: &CancellationToken,
    ) -> lit_pipeline::Result<ToolOutput> {
        self.calls.lock().unwrap().push(command.clone());

        let expr = expression(command);
        let input = PathBuf::from(&command.args[2]);
        let output = PathBuf::from(command.args.last().unwrap());

        if matches(self.hang_on, &expr) {
            cancel.cancelled().await;
            return Err(PipelineError::Cancelled);
        }

        if matches(self.stall_on, &expr) {
            tokio::fs::write(&output, b"partial").await.unwrap();
            std::future::pending::<()>().await;
        }

        if matches(self.fail_on, &expr) {
            // Partial output, as a crashing encoder would leave
            tokio::fs::write(&output, b"partial").await.unwrap();
            return Ok(ToolOutput {
                exit_code: Some(1),
                success: false,
                diagnostics: format!("Error applying {}", expr),
            });
        }

        if !matches(self.no_output_on, &expr) {
            let mut bytes = tokio::fs::read(&input).await.unwrap();
            bytes.push(b'|');
            bytes.extend_from_slice(expr.as_bytes());
            tokio::fs::write(&output, bytes).await.unwrap();
        }

        if matches(self.obstruct_on, &expr) {
            tokio::fs::remove_file(&input).await.unwrap();
            tokio::fs::create_dir(&input).await.unwrap();
            tokio::fs::write(input.join("keep"), b"x").await.unwrap();
        }

        Ok(ToolOutput {
            exit_code: Some(0),
            success: true,
            diagnostics: String::new(),
        })
    }
}

pub fn fake_pipeline(launcher: FakeLauncher) -> EffectPipeline<FakeLauncher> {
    EffectPipeline::with_launcher(PipelineConfig::default(), launcher).unwrap()
}

/// Write a source file with recognizable content
pub fn write_source(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

pub fn read_string(path: &Path) -> String {
    String::from_utf8(std::fs::read(path).unwrap()).unwrap()
}

/// Helper to check if FFmpeg is available
pub async fn is_ffmpeg_available() -> bool {
    tokio::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
        .is_ok_and(|output| output.status.success())
}

/// Write a one second, 44.1 kHz, 16-bit mono sine tone as WAV
pub fn create_test_audio_file(path: &Path) -> std::io::Result<()> {
    let sample_rate: u32 = 44100;
    let bits_per_sample: u16 = 16;
    let num_channels: u16 = 1;
    let num_samples = sample_rate;
    let data_size = num_samples * u32::from(bits_per_sample / 8) * u32::from(num_channels);

    let mut wav = Vec::with_capacity(44 + data_size as usize);

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_size).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&num_channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    let byte_rate = sample_rate * u32::from(num_channels) * u32::from(bits_per_sample / 8);
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&(num_channels * (bits_per_sample / 8)).to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());

    // 440 Hz tone so the effects have signal to work on
    for n in 0..num_samples {
        let t = f64::from(n) / f64::from(sample_rate);
        let sample = ((t * 440.0 * std::f64::consts::TAU).sin() * 8000.0) as i16;
        wav.extend_from_slice(&sample.to_le_bytes());
    }

    std::fs::write(path, wav)
}
