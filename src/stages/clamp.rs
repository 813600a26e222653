//! Clamp Stage
//!
//! Final safety pass: every sample is rounded to the nearest integer and
//! clamped into [0, 255]. Always runs last, unconditionally.

use super::stage::{param_bool, DecayRng, DecayStage, StageParams};
use super::work_buffer::quantize;
use super::WorkBuffer;
use crate::error::{DecayError, Result};
use crate::impl_stage_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Range-enforcing stage
///
/// Deterministic and RNG-free. After it runs, converting the working
/// buffer back to u8 is lossless.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Clamper {
    params: StageParams,
}

impl Clamper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecayStage for Clamper {
    impl_stage_common!(Clamper, "clamp", "Clamp");

    fn process(&mut self, buffer: &mut WorkBuffer, _rng: &mut DecayRng) -> Result<()> {
        // The engine keeps this stage enabled; a caller-built chain may not.
        if !self.params.enabled {
            return Ok(());
        }

        for sample in buffer.samples_mut() {
            *sample = quantize(*sample) as f32;
        }

        Ok(())
    }

    fn get_params(&self) -> Value {
        json!({
            "min": 0,
            "max": 255,
            "rounding": "nearest",
            "enabled": self.params.enabled
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "enabled" => {
                self.params.enabled = param_bool("clamp", name, value)?;
                Ok(())
            }
            _ => Err(DecayError::InvalidParameter {
                stage: "clamp",
                name: name.to_string(),
                reason: "unknown parameter".to_string(),
            }),
        }
    }
}
