//! Decay configuration
//!
//! Every effect parameter is derived once from the integrity scalar, so the
//! activation rules live here and nowhere else.
//!
//! | integrity      | grain | chroma | glitch |
//! |----------------|-------|--------|--------|
//! | 1.0            | -     | -      | -      |
//! | [0.8, 1.0)     | yes   | -      | -      |
//! | [0.5, 0.8)     | yes   | yes    | -      |
//! | [0.0, 0.5)     | yes   | yes    | yes    |

use crate::error::{DecayError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Integrity of an untouched image
pub const FULL_INTEGRITY: f32 = 1.0;

/// Chroma decay starts below this integrity
pub const CHROMA_THRESHOLD: f32 = 0.8;

/// Bit glitching starts below this integrity
pub const GLITCH_THRESHOLD: f32 = 0.5;

/// Grain intensity per unit of damage (damage = 1 - integrity)
pub const GRAIN_PER_DAMAGE: f32 = 0.5;

/// Best encoder quality suggested to codec collaborators
pub const MAX_OUTPUT_QUALITY: u8 = 95;

// ============================================================================
// Decay Configuration
// ============================================================================

/// Per-invocation effect parameters derived from integrity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayConfig {
    /// Integrity after clamping into [0, 1]
    pub integrity: f32,
    /// Grain noise intensity in [0, 0.5]; zero only at full integrity
    pub grain_intensity: f32,
    pub chroma_active: bool,
    /// Desaturation strength in (0, 1] when active, 0 otherwise
    pub chroma_strength: f32,
    pub glitch_active: bool,
    /// Glitch strength in (0, 1] when active, 0 otherwise
    pub glitch_strength: f32,
    /// Encoder quality hint for the codec layer (1..=95)
    pub output_quality: u8,
}

impl DecayConfig {
    /// Derive the configuration for an integrity value
    ///
    /// Values outside [0, 1] are clamped silently. This is a pure
    /// function: no randomness is involved.
    ///
    /// # Errors
    /// `InvalidIntegrity` if `integrity` is NaN.
    pub fn from_integrity(integrity: f32) -> Result<Self> {
        if integrity.is_nan() {
            return Err(DecayError::InvalidIntegrity { value: integrity });
        }

        let integrity = integrity.clamp(0.0, FULL_INTEGRITY);
        let damage = FULL_INTEGRITY - integrity;

        let chroma_active = integrity < CHROMA_THRESHOLD;
        let chroma_strength = if chroma_active {
            (CHROMA_THRESHOLD - integrity) / CHROMA_THRESHOLD
        } else {
            0.0
        };

        let glitch_active = integrity < GLITCH_THRESHOLD;
        let glitch_strength = if glitch_active {
            (GLITCH_THRESHOLD - integrity) / GLITCH_THRESHOLD
        } else {
            0.0
        };

        Ok(Self {
            integrity,
            grain_intensity: damage * GRAIN_PER_DAMAGE,
            chroma_active,
            chroma_strength,
            glitch_active,
            glitch_strength,
            output_quality: output_quality(integrity),
        })
    }

    /// Whether this configuration leaves the image untouched
    pub fn is_identity(&self) -> bool {
        self.grain_intensity <= 0.0 && !self.chroma_active && !self.glitch_active
    }

    /// Check a configuration that did not come from `from_integrity`
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("integrity", self.integrity),
            ("grain_intensity", self.grain_intensity),
            ("chroma_strength", self.chroma_strength),
            ("glitch_strength", self.glitch_strength),
        ];
        for (name, value) in fields {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(DecayError::InvalidConfig {
                    reason: format!("{} must be within [0.0, 1.0], got {}", name, value),
                });
            }
        }
        if self.output_quality == 0 || self.output_quality > 100 {
            return Err(DecayError::InvalidConfig {
                reason: format!("output_quality must be 1..=100, got {}", self.output_quality),
            });
        }
        Ok(())
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Deserialize and validate a configuration from JSON
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let config: DecayConfig = serde_json::from_value(json.clone())?;
        config.validate()?;
        Ok(config)
    }
}

/// Encoder quality that tracks integrity, floored at 1
fn output_quality(integrity: f32) -> u8 {
    let quality = (integrity * MAX_OUTPUT_QUALITY as f32).floor();
    quality.clamp(1.0, MAX_OUTPUT_QUALITY as f32) as u8
}

// ============================================================================
// Tests
// ============================================================================
