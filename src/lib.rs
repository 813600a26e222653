//! BitRot - Progressive Digital Decay for Raster Images
//!
//! BitRot takes a decoded pixel buffer and an integrity value in [0.0, 1.0]
//! and returns a visually degraded copy. Decoding and encoding image files
//! is left to the caller.
//!
//! # Architecture
//!
//! A fixed four-stage pipeline over an f32 working copy of the image:
//! - Grain: Gaussian noise, active whenever integrity < 1.0
//! - Chroma: desaturation toward luma, active below 0.8
//! - Glitch: block shifts, swaps and pixelation, active below 0.5
//! - Clamp: round and clamp every sample into [0, 255], always last
//!
//! All randomness comes from one seeded stream per call, so a fixed seed
//! reproduces the output exactly.
//!
//! ```ignore
//! use bitrot::PixelBuffer;
//!
//! let image = PixelBuffer::new(width, height, 3, rgb_samples)?;
//! let decayed = bitrot::decay(&image, 0.35, Some(42))?;
//! ```

pub mod engine;
pub mod error;
pub mod stages;

pub use engine::{DecayConfig, DecayEngine, DecayOutput, PixelBuffer};
pub use error::{DecayError, Result};

/// Decay a buffer with a default engine
///
/// See [`DecayEngine::decay`].
pub fn decay(buffer: &PixelBuffer, integrity: f32, seed: Option<u64>) -> Result<PixelBuffer> {
    DecayEngine::new().decay(buffer, integrity, seed)
}
