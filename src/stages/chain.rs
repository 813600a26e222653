//! Stage Chain management
//!
//! Stages are processed in chain order (index 0 first). The pipeline order
//! is fixed because each stage reads the previous stage's output:
//! 1. Grain
//! 2. Chroma
//! 3. Glitch
//! 4. Clamp (always last)

use super::stage::{DecayRng, DecayStage};
use super::WorkBuffer;
use crate::error::Result;
use serde::Serialize;
use tracing::debug;

/// Order priority for each stage type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StagePosition {
    Grain = 0,
    Chroma = 1,
    Glitch = 2,
    Clamp = 3,
}

impl StagePosition {
    /// Get the pipeline position for a stage type
    pub fn for_stage_type(stage_type: &str) -> Self {
        match stage_type {
            "grain" => StagePosition::Grain,
            "chroma" => StagePosition::Chroma,
            "glitch" => StagePosition::Glitch,
            "clamp" => StagePosition::Clamp,
            _ => StagePosition::Glitch, // Unknown stages run before the clamp
        }
    }
}

/// What happened to one stage during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOutcome {
    pub stage: &'static str,
    /// False when the stage was disabled and skipped entirely
    pub applied: bool,
}

/// Ordered chain of decay stages
#[derive(Clone, Default)]
pub struct StageChain {
    stages: Vec<Box<dyn DecayStage>>,
}

impl StageChain {
    /// Create a new empty chain
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Add a stage at its pipeline position
    ///
    /// Stages of the same type keep insertion order.
    pub fn add(&mut self, stage: Box<dyn DecayStage>) {
        let position = self.position_for(stage.stage_type());
        self.stages.insert(position, stage);
    }

    /// Get a reference to the first stage of a type
    pub fn get(&self, stage_type: &str) -> Option<&dyn DecayStage> {
        self.stages
            .iter()
            .find(|s| s.stage_type() == stage_type)
            .map(|s| s.as_ref())
    }

    /// Get a mutable reference to the first stage of a type
    pub fn get_mut(&mut self, stage_type: &str) -> Option<&mut (dyn DecayStage + 'static)> {
        for stage in &mut self.stages {
            if stage.stage_type() == stage_type {
                return Some(stage.as_mut());
            }
        }
        None
    }

    /// Run every stage in order
    ///
    /// Disabled stages are skipped without touching the buffer or the
    /// random stream. The first stage error aborts the run.
    pub fn process(
        &mut self,
        buffer: &mut WorkBuffer,
        rng: &mut DecayRng,
    ) -> Result<Vec<StageOutcome>> {
        let mut outcomes = Vec::with_capacity(self.stages.len());
        for stage in &mut self.stages {
            let applied = stage.is_enabled();
            if applied {
                debug!(stage = stage.stage_type(), params = %stage.get_params(), "applying stage");
                stage.process(buffer, rng)?;
            } else {
                debug!(stage = stage.stage_type(), "stage inactive, skipped");
            }
            outcomes.push(StageOutcome {
                stage: stage.stage_type(),
                applied,
            });
        }
        Ok(outcomes)
    }

    /// Get the number of stages in the chain
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Iterate over stages in order
    pub fn iter(&self) -> impl Iterator<Item = &dyn DecayStage> {
        self.stages.iter().map(|s| s.as_ref())
    }

    /// Serialize the chain's stage parameters to JSON
    pub fn to_json(&self) -> serde_json::Value {
        let stages: Vec<serde_json::Value> = self
            .stages
            .iter()
            .map(|s| {
                serde_json::json!({
                    "type": s.stage_type(),
                    "params": s.get_params(),
                })
            })
            .collect();
        serde_json::json!({ "stages": stages })
    }

    fn position_for(&self, stage_type: &str) -> usize {
        let priority = StagePosition::for_stage_type(stage_type);
        self.stages
            .iter()
            .position(|s| StagePosition::for_stage_type(s.stage_type()) > priority)
            .unwrap_or(self.stages.len())
    }
}
