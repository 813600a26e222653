//! Chroma Decay Stage
//!
//! Desaturates pixels toward their Rec.601 luma, simulating faded color.

use super::stage::{param_bool, param_f32, DecayRng, DecayStage, StageParams};
use super::WorkBuffer;
use crate::error::{DecayError, Result};
use crate::impl_stage_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ============================================================================
// Constants
// ============================================================================

/// Rec.601 luma weights for red, green, blue
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

// ============================================================================
// Helper Functions
// ============================================================================

/// Rec.601 luma of an RGB triple
#[inline]
pub fn luma(r: f32, g: f32, b: f32) -> f32 {
    LUMA_WEIGHTS[0] * r + LUMA_WEIGHTS[1] * g + LUMA_WEIGHTS[2] * b
}

// ============================================================================
// Chroma Decayer
// ============================================================================

/// Desaturation stage
///
/// Each color channel moves toward the pixel's luma:
/// `new = old + fraction * (luma - old)` with `fraction = clamp(strength, 0, 1)`,
/// so a strength of 1.0 yields a fully gray pixel and never overshoots.
/// Alpha is untouched. No randomness is consumed.
///
/// # Parameters
/// - `strength`: Desaturation amount (0.0 to 1.0)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChromaDecayer {
    params: StageParams,
    strength: f32,
}

impl ChromaDecayer {
    /// Create a chroma stage
    ///
    /// # Arguments
    /// * `strength` - Desaturation strength; non-finite values become 0
    pub fn new(strength: f32) -> Self {
        let mut chroma = Self {
            params: StageParams::default(),
            strength: 0.0,
        };
        chroma.set_strength(strength);
        chroma
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Set the strength, stored as given (finite) and saturated at use
    pub fn set_strength(&mut self, strength: f32) {
        self.strength = if strength.is_finite() { strength.max(0.0) } else { 0.0 };
    }

    /// Interpolation fraction actually applied
    pub fn fraction(&self) -> f32 {
        self.strength.clamp(0.0, 1.0)
    }
}

impl Default for ChromaDecayer {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl DecayStage for ChromaDecayer {
    impl_stage_common!(ChromaDecayer, "chroma", "Chroma Decay");

    fn process(&mut self, buffer: &mut WorkBuffer, _rng: &mut DecayRng) -> Result<()> {
        let fraction = self.fraction();
        if !self.params.enabled || fraction <= 0.0 {
            return Ok(());
        }

        let channels = buffer.channels();
        for pixel in buffer.samples_mut().chunks_exact_mut(channels) {
            let gray = luma(pixel[0], pixel[1], pixel[2]);
            for sample in pixel.iter_mut().take(3) {
                *sample += fraction * (gray - *sample);
            }
        }

        Ok(())
    }

    fn get_params(&self) -> Value {
        json!({
            "strength": self.strength,
            "fraction": self.fraction(),
            "enabled": self.params.enabled
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "strength" => {
                self.set_strength(param_f32("chroma", name, value)?);
                Ok(())
            }
            "enabled" => {
                self.params.enabled = param_bool("chroma", name, value)?;
                Ok(())
            }
            _ => Err(DecayError::InvalidParameter {
                stage: "chroma",
                name: name.to_string(),
                reason: "unknown parameter".to_string(),
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
