//! Lit Listener effect pipeline
//!
//! Applies audio effects to a file by running an external tool (ffmpeg)
//! once per effect, committing each result atomically into a single
//! canonical working file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌────────────────┐
//! │ Source File │ ──► │ Base Copy    │ ──► │ Working File   │
//! └─────────────┘     └──────────────┘     └────────────────┘
//!                                                  │
//!        for each effect: [denoise] pitch → amplification → compression → filter
//!                                                  ▼
//! ┌─────────────┐     ┌──────────────┐     ┌────────────────┐
//! │ Validator   │ ──► │ Stage Runner │ ──► │ Promote        │
//! │ (skip/run)  │     │ (ffmpeg)     │     │ (delete+rename)│
//! └─────────────┘     └──────────────┘     └────────────────┘
//! ```
//!
//! - `validate`: parameter ranges; out-of-range effects are skipped
//! - `filter`: filter arguments for each effect
//! - `runner`: subprocess invocation behind the [`ToolLauncher`] seam
//! - `staging`: working/temp file naming, base copy, promotion
//! - `pipeline`: the orchestrator
//!
//! A failed stage stops the run. The working file then holds exactly the
//! effects committed before the failure.
//!
//! # Example
//!
//! ```ignore
//! use lit_pipeline::{EffectPipeline, PipelineConfig, TransformRequest};
//!
//! let pipeline = EffectPipeline::new(PipelineConfig::default())?;
//! let request = TransformRequest::new().with_pitch(1.2).with_amplification(1.5);
//! let report = pipeline.process(Path::new("/app/audio/clip.wav"), &request).await?;
//! println!("{} ({:?} applied)", report.working_file.display(), report.applied);
//! ```

#![deny(unsafe_code)]

mod config;
mod effect;
mod error;
pub mod filter;
mod pipeline;
pub mod runner;
pub mod staging;
pub mod validate;

pub use config::{PipelineConfig, DEFAULT_TOOL};
pub use effect::{EffectKind, TransformRequest};
pub use error::{PipelineError, PipelineFailure, Result};
pub use pipeline::{EffectPipeline, PipelineReport};
pub use runner::{ProcessLauncher, StageOutput, StageRunner, ToolCommand, ToolLauncher, ToolOutput};
pub use staging::{StagingConfig, StagingManager, WorkingFile, WorkingState};
pub use validate::is_applicable;

/// Re-exported so callers can cancel runs without depending on tokio-util directly
pub use tokio_util::sync::CancellationToken;
