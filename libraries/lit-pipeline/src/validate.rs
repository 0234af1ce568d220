//! Parameter range checks
//!
//! The ranges match what ffmpeg's filters accept. An effect whose
//! parameters are absent or out of range is skipped, never rejected.

use crate::effect::{EffectKind, TransformRequest};
use std::ops::RangeInclusive;

/// Pitch factor bounds (exclusive)
pub const PITCH_FACTOR_MIN: f64 = 0.5;
pub const PITCH_FACTOR_MAX: f64 = 2.0;

/// Amplification factor bounds (exclusive)
pub const AMPLIFICATION_FACTOR_MIN: f64 = 0.1;
pub const AMPLIFICATION_FACTOR_MAX: f64 = 5.0;

/// Compressor threshold in dB
pub const COMPRESSION_THRESHOLD_DB: RangeInclusive<f64> = -60.0..=0.0;
pub const COMPRESSION_RATIO: RangeInclusive<f64> = 1.0..=20.0;

/// Band-pass center frequency in Hz
pub const FILTER_FREQUENCY_HZ: RangeInclusive<f64> = 20.0..=20_000.0;
/// Band-pass width in Hz
pub const FILTER_BANDWIDTH_HZ: RangeInclusive<f64> = 10.0..=1_000.0;

/// Decide whether `kind` should run for this request
pub fn is_applicable(kind: EffectKind, request: &TransformRequest) -> bool {
    match kind {
        EffectKind::Pitch => request
            .pitch_factor
            .is_some_and(|f| f > PITCH_FACTOR_MIN && f < PITCH_FACTOR_MAX),
        EffectKind::Amplification => request
            .amplification_factor
            .is_some_and(|f| f > AMPLIFICATION_FACTOR_MIN && f < AMPLIFICATION_FACTOR_MAX),
        EffectKind::Compression => {
            within(request.compression_threshold, &COMPRESSION_THRESHOLD_DB)
                && within(request.compression_ratio, &COMPRESSION_RATIO)
        }
        EffectKind::Filter => {
            within(request.filter_frequency, &FILTER_FREQUENCY_HZ)
                && within(request.filter_bandwidth, &FILTER_BANDWIDTH_HZ)
        }
        // No tunable parameters
        EffectKind::Denoise => true,
    }
}

fn within(value: Option<f64>, range: &RangeInclusive<f64>) -> bool {
    value.is_some_and(|v| range.contains(&v))
}
