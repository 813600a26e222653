//! Decay engine
//!
//! Derives a [`DecayConfig`] from integrity, seeds one random stream for the
//! whole call, and runs Grain -> Chroma -> Glitch -> Clamp over a working
//! copy of the input. The caller's buffer is never mutated.

use super::{DecayConfig, PixelBuffer};
use crate::error::Result;
use crate::stages::{
    BitGlitcher, ChromaDecayer, Clamper, DecayRng, DecayStage, GrainInjector, StageChain,
    StageOutcome, WorkBuffer,
};
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, debug_span};

// ============================================================================
// Helper Functions
// ============================================================================

/// SplitMix64 finalizer, used to derive independent per-buffer seeds
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Use the caller's seed, or draw one from process entropy
fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}

// ============================================================================
// Decay Output
// ============================================================================

/// Result of a decay call with everything needed to replay it
#[derive(Debug, Clone)]
pub struct DecayOutput {
    pub buffer: PixelBuffer,
    pub config: DecayConfig,
    /// Seed the random stream was created from
    pub seed: u64,
    /// Stage activity in pipeline order; empty for the identity shortcut
    pub stages: Vec<StageOutcome>,
}

impl DecayOutput {
    /// Whether a stage type ran during this call
    pub fn stage_applied(&self, stage_type: &str) -> bool {
        self.stages
            .iter()
            .any(|outcome| outcome.stage == stage_type && outcome.applied)
    }
}

// ============================================================================
// Decay Engine
// ============================================================================

/// The decay pipeline orchestrator
///
/// Stateless: every call builds its own stage chain and random stream, so
/// one engine can be shared freely across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecayEngine;

impl DecayEngine {
    /// Create a new DecayEngine.
    pub fn new() -> Self {
        Self
    }

    /// Build the stage chain for a configuration
    ///
    /// All four stages are present; inactive ones, and active ones with zero
    /// strength, are disabled so they are skipped without consuming
    /// randomness. The clamp stage is always enabled.
    pub fn build_chain(config: &DecayConfig) -> StageChain {
        let mut grain = GrainInjector::new(config.grain_intensity);
        grain.set_enabled(config.grain_intensity > 0.0);

        let mut chroma = ChromaDecayer::new(config.chroma_strength);
        chroma.set_enabled(config.chroma_active && config.chroma_strength > 0.0);

        let mut glitch = BitGlitcher::new(config.glitch_strength);
        glitch.set_enabled(config.glitch_active && config.glitch_strength > 0.0);

        let mut chain = StageChain::new();
        chain.add(Box::new(grain));
        chain.add(Box::new(chroma));
        chain.add(Box::new(glitch));
        chain.add(Box::new(Clamper::new()));
        chain
    }

    /// Decay a buffer
    ///
    /// # Arguments
    /// * `buffer` - Decoded input raster (left untouched)
    /// * `integrity` - 1.0 = untouched, 0.0 = maximally decayed; clamped
    /// * `seed` - Fixed seed for reproducible output, or None for entropy
    ///
    /// # Errors
    /// `InvalidIntegrity` if `integrity` is NaN.
    pub fn decay(&self, buffer: &PixelBuffer, integrity: f32, seed: Option<u64>) -> Result<PixelBuffer> {
        Ok(self.decay_detailed(buffer, integrity, seed)?.buffer)
    }

    /// Decay a buffer and report the configuration, seed and stage activity
    pub fn decay_detailed(
        &self,
        buffer: &PixelBuffer,
        integrity: f32,
        seed: Option<u64>,
    ) -> Result<DecayOutput> {
        let config = DecayConfig::from_integrity(integrity)?;
        if config.integrity != integrity {
            debug!(requested = integrity, used = config.integrity, "integrity clamped");
        }
        self.run(buffer, config, seed)
    }

    /// Decay a buffer with a caller-supplied configuration
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration fails validation.
    pub fn decay_with_config(
        &self,
        buffer: &PixelBuffer,
        config: &DecayConfig,
        seed: Option<u64>,
    ) -> Result<DecayOutput> {
        config.validate()?;
        self.run(buffer, *config, seed)
    }

    /// Decay raw decoded samples
    ///
    /// The input boundary for codec collaborators that hold a plain byte
    /// vector rather than a [`PixelBuffer`].
    ///
    /// # Errors
    /// `InvalidBuffer` if the sample count does not match the dimensions or
    /// the channel count is not 3 or 4.
    pub fn decay_samples(
        &self,
        width: usize,
        height: usize,
        channels: usize,
        samples: Vec<u8>,
        integrity: f32,
        seed: Option<u64>,
    ) -> Result<Vec<u8>> {
        let buffer = PixelBuffer::new(width, height, channels, samples)?;
        Ok(self.decay(&buffer, integrity, seed)?.into_samples())
    }

    /// Decay many independent buffers in parallel
    ///
    /// Buffer `i` is decayed with seed `splitmix64(base_seed + i)`, so the
    /// batch is reproducible for a fixed base seed regardless of thread
    /// scheduling. Output order matches input order.
    pub fn decay_batch(
        &self,
        buffers: &[PixelBuffer],
        integrity: f32,
        base_seed: Option<u64>,
    ) -> Result<Vec<PixelBuffer>> {
        // Fail before spawning work on a bad integrity
        DecayConfig::from_integrity(integrity)?;
        let base = resolve_seed(base_seed);
        debug!(count = buffers.len(), base_seed = base, "decaying batch");

        buffers
            .par_iter()
            .enumerate()
            .map(|(index, buffer)| {
                let seed = splitmix64(base.wrapping_add(index as u64));
                self.decay(buffer, integrity, Some(seed))
            })
            .collect()
    }

    fn run(&self, buffer: &PixelBuffer, config: DecayConfig, seed: Option<u64>) -> Result<DecayOutput> {
        let seed = resolve_seed(seed);
        let span = debug_span!(
            "decay",
            width = buffer.width(),
            height = buffer.height(),
            channels = buffer.channels(),
            integrity = config.integrity
        );
        let _entered = span.enter();

        if config.is_identity() {
            debug!("full integrity, returning unmodified copy");
            return Ok(DecayOutput {
                buffer: buffer.clone(),
                config,
                seed,
                stages: Vec::new(),
            });
        }

        debug!(seed, ?config, "decay configuration");

        let mut work = WorkBuffer::from_pixels(buffer);
        let mut rng = DecayRng::seed_from_u64(seed);
        let stages = Self::build_chain(&config).process(&mut work, &mut rng)?;

        Ok(DecayOutput {
            buffer: work.to_pixels()?,
            config,
            seed,
            stages,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_rgb(width: usize, height: usize) -> PixelBuffer {
        let samples = (0..width * height * 3).map(|i| (i * 7 % 256) as u8).collect();
        PixelBuffer::new(width, height, 3, samples).unwrap()
    }

    #[test]
    fn test_identity() {
        let buffer = ramp_rgb(5, 3);
        let output = DecayEngine::new()
            .decay_detailed(&buffer, 1.0, Some(1))
            .unwrap();
        assert_eq!(output.buffer, buffer);
        assert!(output.stages.is_empty());
    }

    #[test]
    fn test_nan_integrity() {
        let err = DecayEngine::new()
            .decay(&ramp_rgb(2, 2), f32::NAN, Some(1))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INTEGRITY");
    }

    #[test]
    fn test_chain_activation() {
        let chain = DecayEngine::build_chain(&DecayConfig::from_integrity(0.6).unwrap());
        let enabled: Vec<(&str, bool)> = chain
            .iter()
            .map(|s| (s.stage_type(), s.is_enabled()))
            .collect();
        assert_eq!(
            enabled,
            vec![("grain", true), ("chroma", true), ("glitch", false), ("clamp", true)]
        );
    }

    #[test]
    fn test_detailed_reports_stages() {
        let output = DecayEngine::new()
            .decay_detailed(&ramp_rgb(8, 8), 0.2, Some(5))
            .unwrap();
        assert_eq!(output.seed, 5);
        for stage in ["grain", "chroma", "glitch", "clamp"] {
            assert!(output.stage_applied(stage), "{} did not run", stage);
        }
    }

    #[test]
    fn test_entropy_seed_is_replayable() {
        let engine = DecayEngine::new();
        let buffer = ramp_rgb(6, 6);
        let first = engine.decay_detailed(&buffer, 0.3, None).unwrap();
        let replay = engine.decay(&buffer, 0.3, Some(first.seed)).unwrap();
        assert_eq!(first.buffer, replay);
    }

    #[test]
    fn test_decay_samples_rejects_bad_shape() {
        let err = DecayEngine::new()
            .decay_samples(3, 3, 3, vec![0; 26], 0.5, Some(1))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_BUFFER");

        let err = DecayEngine::new()
            .decay_samples(2, 2, 2, vec![0; 8], 0.5, Some(1))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_BUFFER");
    }

    #[test]
    fn test_decay_with_config_validates() {
        let mut config = DecayConfig::from_integrity(0.4).unwrap();
        config.chroma_strength = f32::NAN;
        let err = DecayEngine::new()
            .decay_with_config(&ramp_rgb(2, 2), &config, Some(1))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_zero_strength_stage_is_skipped() {
        let mut config = DecayConfig::from_integrity(0.2).unwrap();
        config.glitch_strength = 0.0;
        config.chroma_strength = 0.0;
        assert!(config.glitch_active && config.chroma_active);

        let output = DecayEngine::new()
            .decay_with_config(&ramp_rgb(8, 8), &config, Some(3))
            .unwrap();
        assert!(output.stage_applied("grain"));
        assert!(!output.stage_applied("chroma"));
        assert!(!output.stage_applied("glitch"));

        let mut grain_only = config;
        grain_only.chroma_active = false;
        grain_only.glitch_active = false;
        let expected = DecayEngine::new()
            .decay_with_config(&ramp_rgb(8, 8), &grain_only, Some(3))
            .unwrap();
        assert_eq!(output.buffer, expected.buffer);
    }

    #[test]
    fn test_out_of_range_integrity_is_clamped() {
        let engine = DecayEngine::new();
        let buffer = ramp_rgb(6, 4);

        let high = engine.decay_detailed(&buffer, 1.2, Some(8)).unwrap();
        assert_eq!(high.config.integrity, 1.0);
        assert_eq!(high.buffer, buffer);

        let low = engine.decay_detailed(&buffer, -3.0, Some(8)).unwrap();
        assert_eq!(low.config.integrity, 0.0);
        assert_eq!(low.buffer, engine.decay(&buffer, 0.0, Some(8)).unwrap());
    }

    #[test]
    fn test_splitmix_spreads_adjacent_seeds() {
        assert_ne!(splitmix64(0), splitmix64(1));
        assert_ne!(splitmix64(1) >> 32, splitmix64(2) >> 32);
    }
}
