//! Grain Stage
//!
//! Additive Gaussian luminance noise simulating sensor/film grain.

use super::stage::{param_bool, param_f32, DecayRng, DecayStage, StageParams};
use super::WorkBuffer;
use crate::error::{DecayError, Result};
use crate::impl_stage_common;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ============================================================================
// Constants
// ============================================================================

/// Noise standard deviation per unit of intensity (half the sample range)
pub const SIGMA_PER_INTENSITY: f32 = 127.5;

/// Noise is truncated at this many standard deviations
pub const TRUNCATE_SIGMAS: f32 = 3.0;

/// Maximum accepted intensity
const MAX_INTENSITY: f32 = 1.0;

// ============================================================================
// Helper Functions
// ============================================================================

/// Draw a standard normal value with the Box-Muller transform
///
/// Consumes exactly two uniform draws.
#[inline]
fn standard_normal(rng: &mut DecayRng) -> f32 {
    // gen::<f32>() is in [0, 1); shift to (0, 1] so ln() stays finite
    let u1 = 1.0 - rng.gen::<f32>();
    let u2 = rng.gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}

// ============================================================================
// Grain Injector
// ============================================================================

/// Additive noise stage
///
/// Every color sample receives `N(0, sigma)` noise with
/// `sigma = intensity * 127.5`, truncated to `±3·sigma`. Results are not
/// clamped here; the clamp stage handles that. Alpha is never touched.
///
/// # Parameters
/// - `intensity`: Noise intensity (0.0 to 1.0); 0 is a true no-op
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrainInjector {
    params: StageParams,
    intensity: f32,
}

impl GrainInjector {
    /// Create a grain stage
    ///
    /// # Arguments
    /// * `intensity` - Noise intensity, clamped to [0, 1]
    pub fn new(intensity: f32) -> Self {
        Self {
            params: StageParams::default(),
            intensity: intensity.clamp(0.0, MAX_INTENSITY),
        }
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity.clamp(0.0, MAX_INTENSITY);
    }

    /// Noise standard deviation in sample units
    pub fn sigma(&self) -> f32 {
        self.intensity * SIGMA_PER_INTENSITY
    }
}

impl Default for GrainInjector {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl DecayStage for GrainInjector {
    impl_stage_common!(GrainInjector, "grain", "Grain");

    fn process(&mut self, buffer: &mut WorkBuffer, rng: &mut DecayRng) -> Result<()> {
        if !self.params.enabled || self.intensity <= 0.0 {
            return Ok(());
        }

        let sigma = self.sigma();
        let limit = TRUNCATE_SIGMAS * sigma;
        let channels = buffer.channels();
        let alpha = buffer.layout().alpha_index();

        for pixel in buffer.samples_mut().chunks_exact_mut(channels) {
            for (channel, sample) in pixel.iter_mut().enumerate() {
                if Some(channel) == alpha {
                    continue;
                }
                let noise = (standard_normal(rng) * sigma).clamp(-limit, limit);
                *sample += noise;
            }
        }

        Ok(())
    }

    fn get_params(&self) -> Value {
        json!({
            "intensity": self.intensity,
            "sigma": self.sigma(),
            "enabled": self.params.enabled
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "intensity" => {
                self.set_intensity(param_f32("grain", name, value)?);
                Ok(())
            }
            "enabled" => {
                self.params.enabled = param_bool("grain", name, value)?;
                Ok(())
            }
            _ => Err(DecayError::InvalidParameter {
                stage: "grain",
                name: name.to_string(),
                reason: "unknown parameter".to_string(),
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
