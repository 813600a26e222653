//! Decay Engine Module
//!
//! Core decay pipeline including:
//! - Pixel buffer management
//! - Integrity-derived configuration
//! - Stage orchestration and batch processing

pub mod buffer;
pub mod config;
pub mod decay;

pub use buffer::{ChannelLayout, PixelBuffer, MAX_SAMPLE};
pub use config::{
    DecayConfig, CHROMA_THRESHOLD, FULL_INTEGRITY, GLITCH_THRESHOLD, GRAIN_PER_DAMAGE,
    MAX_OUTPUT_QUALITY,
};
pub use decay::{splitmix64, DecayEngine, DecayOutput};
