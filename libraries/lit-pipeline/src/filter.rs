//! ffmpeg filter argument construction
//!
//! Arguments depend on the request parameters only, never on the contents of
//! the file being processed, so the same inputs always give the same argv.

use crate::effect::{EffectKind, TransformRequest};
use crate::error::{PipelineError, Result};

/// Reference sample rate that pitch factors scale
pub const BASE_SAMPLE_RATE: f64 = 44_100.0;

/// Fixed noise-reduction filter
pub const DENOISE_FILTER: &str = "afftdn";

/// Build the filter arguments for one effect stage
///
/// Returns the flag and filter expression that go between the input and
/// output paths on the tool's command line.
pub fn build_args(kind: EffectKind, request: &TransformRequest) -> Result<Vec<String>> {
    let flag = match kind {
        EffectKind::Denoise => "-af",
        _ => "-filter:a",
    };
    Ok(vec![flag.to_string(), filter_expression(kind, request)?])
}

/// The filter expression for one effect
pub fn filter_expression(kind: EffectKind, request: &TransformRequest) -> Result<String> {
    let missing = || PipelineError::InvalidParameters(kind);

    let expression = match kind {
        EffectKind::Pitch => {
            let factor = request.pitch_factor.ok_or_else(missing)?;
            // asetrate takes an integer sample rate
            let rate = (BASE_SAMPLE_RATE * factor).round() as u32;
            format!("asetrate={}", rate)
        }
        EffectKind::Amplification => {
            let factor = request.amplification_factor.ok_or_else(missing)?;
            format!("volume={}", factor)
        }
        EffectKind::Compression => {
            let threshold = request.compression_threshold.ok_or_else(missing)?;
            let ratio = request.compression_ratio.ok_or_else(missing)?;
            // acompressor wants a linear threshold; the dB suffix converts it
            format!("acompressor=threshold={}dB:ratio={}", threshold, ratio)
        }
        EffectKind::Filter => {
            let frequency = request.filter_frequency.ok_or_else(missing)?;
            let bandwidth = request.filter_bandwidth.ok_or_else(missing)?;
            format!("bandpass=f={}:width_type=h:w={}", frequency, bandwidth)
        }
        EffectKind::Denoise => DENOISE_FILTER.to_string(),
    };

    Ok(expression)
}
