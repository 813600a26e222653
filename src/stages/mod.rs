//! Decay Stages
//!
//! Independent corruption effects composed by the engine.
//! All stages implement the `DecayStage` trait for uniform processing.

mod chain;
mod chroma;
mod clamp;
mod glitch;
mod grain;
mod stage;
mod work_buffer;

pub use chain::{StageChain, StageOutcome, StagePosition};
pub use chroma::{luma, ChromaDecayer, LUMA_WEIGHTS};
pub use clamp::Clamper;
pub use glitch::{event_count, BitGlitcher, GlitchBlock, GlitchEvent, GlitchKind, MAX_EVENTS};
pub use grain::{GrainInjector, SIGMA_PER_INTENSITY, TRUNCATE_SIGMAS};
pub use stage::{DecayRng, DecayStage, StageParams};
pub use work_buffer::{quantize, WorkBuffer};
