//! Stage trait definition
//!
//! Base trait for every decay stage in the pipeline.

use super::WorkBuffer;
use crate::error::Result;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pseudorandom stream threaded through every stage of one decay call
pub type DecayRng = StdRng;

/// Parameters common to all stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageParams {
    /// Whether the stage runs; a disabled stage neither mutates the buffer
    /// nor draws from the random stream
    pub enabled: bool,
}

impl Default for StageParams {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Base trait for all decay stages
///
/// Stages mutate the working buffer in place. Randomized stages draw only
/// from the `rng` they are handed, so a fixed seed reproduces the output.
pub trait DecayStage: Send + Sync {
    /// Process the buffer in place
    fn process(&mut self, buffer: &mut WorkBuffer, rng: &mut DecayRng) -> Result<()>;

    /// Get the stage type identifier
    fn stage_type(&self) -> &'static str;

    /// Get human-readable display name
    fn display_name(&self) -> &str;

    /// Check if the stage is enabled
    fn is_enabled(&self) -> bool;

    /// Enable or disable the stage
    fn set_enabled(&mut self, enabled: bool);

    /// Get all parameters as JSON
    fn get_params(&self) -> Value;

    /// Set a single parameter by name
    fn set_param(&mut self, name: &str, value: &Value) -> Result<()>;

    /// Clone the stage into a boxed trait object
    fn box_clone(&self) -> Box<dyn DecayStage>;
}

impl Clone for Box<dyn DecayStage> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Read a numeric parameter value, or fail naming the stage and parameter
pub(crate) fn param_f32(stage: &'static str, name: &str, value: &Value) -> Result<f32> {
    value
        .as_f64()
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
        .ok_or_else(|| crate::error::DecayError::InvalidParameter {
            stage,
            name: name.to_string(),
            reason: format!("expected finite number, got {}", value),
        })
}

/// Read a boolean parameter value
pub(crate) fn param_bool(stage: &'static str, name: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| crate::error::DecayError::InvalidParameter {
            stage,
            name: name.to_string(),
            reason: format!("expected bool, got {}", value),
        })
}

/// Helper macro to implement common DecayStage trait methods
#[macro_export]
macro_rules! impl_stage_common {
    ($type:ty, $stage_type:expr, $display_name:expr) => {
        fn stage_type(&self) -> &'static str {
            $stage_type
        }

        fn display_name(&self) -> &str {
            $display_name
        }

        fn is_enabled(&self) -> bool {
            self.params.enabled
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.params.enabled = enabled;
        }

        fn box_clone(&self) -> Box<dyn DecayStage> {
            Box::new(self.clone())
        }
    };
}
