use serde::{Deserialize, Serialize};

use crate::FeatureVector;

/// Volume units that add one unit of mesh scale.
const SCALE_DIVISOR: f32 = 50.0;
/// Byte-magnitude full scale for the colour channels.
const COLOR_DIVISOR: f32 = 256.0;
/// Rotation phase advance per wall-clock millisecond, in radians.
const ROTATION_RATE: f64 = 0.002;

/// Renderable parameter set driven by one feature vector.
///
/// The mapping is intentionally simple and linear; its value is the
/// separation from analysis. Any visual target binds to [`FeatureVector`]
/// through a constructor like this one without touching the analyser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualParams {
    /// Uniform mesh scale, `1 + volume / 50`; exactly 1.0 at silence.
    pub scale: f32,
    /// RGB components `(bass/256, 1 - bass/256, treble/256)`, each clamped
    /// to `[0, 1]`.
    pub color: [f32; 3],
    /// Rotation phase in radians, `wall_time_ms × 0.002`, applied
    /// identically to both spin axes; grows monotonically with wall time.
    pub rotation: f32,
}

impl VisualParams {
    /// Evaluates the fixed mapping formulas for one render tick.
    pub fn from_features(features: &FeatureVector, wall_time_ms: f64) -> Self {
        let bass = features.bass / COLOR_DIVISOR;
        let treble = features.treble / COLOR_DIVISOR;
        Self {
            scale: 1.0 + features.volume / SCALE_DIVISOR,
            color: [
                bass.clamp(0.0, 1.0),
                (1.0 - bass).clamp(0.0, 1.0),
                treble.clamp(0.0, 1.0),
            ],
            rotation: (wall_time_ms * ROTATION_RATE) as f32,
        }
    }
}

impl Default for VisualParams {
    /// The idle parameter set: what a silent signal maps to at wall time 0.
    fn default() -> Self {
        Self::from_features(&FeatureVector::default(), 0.0)
    }
}
