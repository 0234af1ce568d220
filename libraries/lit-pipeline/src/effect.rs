//! Effect kinds and transform requests

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One audio transformation the pipeline can apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Pitch,
    Amplification,
    Compression,
    Filter,
    Denoise,
}

impl EffectKind {
    /// Parameter-gated effects, in the order they are always applied
    pub const GATED_ORDER: [EffectKind; 4] = [
        EffectKind::Pitch,
        EffectKind::Amplification,
        EffectKind::Compression,
        EffectKind::Filter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Pitch => "pitch",
            EffectKind::Amplification => "amplification",
            EffectKind::Compression => "compression",
            EffectKind::Filter => "filter",
            EffectKind::Denoise => "denoise",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pitch" => Ok(EffectKind::Pitch),
            "amplification" => Ok(EffectKind::Amplification),
            "compression" => Ok(EffectKind::Compression),
            "filter" => Ok(EffectKind::Filter),
            "denoise" => Ok(EffectKind::Denoise),
            _ => Err(PipelineError::UnknownEffect(s.to_string())),
        }
    }
}

/// Requested effect parameters for one pipeline run
///
/// Every numeric field is independently absent, present-but-out-of-range or
/// valid. Only valid effects run; everything else is skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformRequest {
    pub pitch_factor: Option<f64>,
    pub amplification_factor: Option<f64>,
    /// Compressor threshold in dB
    pub compression_threshold: Option<f64>,
    pub compression_ratio: Option<f64>,
    /// Band-pass center frequency in Hz
    pub filter_frequency: Option<f64>,
    /// Band-pass width in Hz
    pub filter_bandwidth: Option<f64>,
    /// Run the noise-reduction stage right after the base copy
    pub denoise: bool,
}

impl TransformRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pitch(mut self, factor: f64) -> Self {
        self.pitch_factor = Some(factor);
        self
    }

    pub fn with_amplification(mut self, factor: f64) -> Self {
        self.amplification_factor = Some(factor);
        self
    }

    pub fn with_compression(mut self, threshold_db: f64, ratio: f64) -> Self {
        self.compression_threshold = Some(threshold_db);
        self.compression_ratio = Some(ratio);
        self
    }

    pub fn with_filter(mut self, frequency_hz: f64, bandwidth_hz: f64) -> Self {
        self.filter_frequency = Some(frequency_hz);
        self.filter_bandwidth = Some(bandwidth_hz);
        self
    }

    pub fn with_denoise(mut self) -> Self {
        self.denoise = true;
        self
    }

    /// Narrow the request to a single effect's parameters
    ///
    /// Used for single-effect requests: every field that does not belong to
    /// `kind` is cleared, so only that effect can run.
    pub fn only(&self, kind: EffectKind) -> Self {
        let mut narrowed = Self::default();
        match kind {
            EffectKind::Pitch => narrowed.pitch_factor = self.pitch_factor,
            EffectKind::Amplification => {
                narrowed.amplification_factor = self.amplification_factor;
            }
            EffectKind::Compression => {
                narrowed.compression_threshold = self.compression_threshold;
                narrowed.compression_ratio = self.compression_ratio;
            }
            EffectKind::Filter => {
                narrowed.filter_frequency = self.filter_frequency;
                narrowed.filter_bandwidth = self.filter_bandwidth;
            }
            EffectKind::Denoise => narrowed.denoise = true,
        }
        narrowed
    }
}
