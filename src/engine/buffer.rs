//! Pixel Buffer Management
//!
//! Provides the decoded raster type the engine consumes and produces, plus
//! comparison metrics used to measure how far a decayed image has drifted.

use crate::error::{DecayError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Maximum value of a single channel sample
pub const MAX_SAMPLE: u8 = u8::MAX;

// ============================================================================
// Channel Layout
// ============================================================================

/// Pixel channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Three interleaved channels (red, green, blue)
    #[default]
    Rgb,
    /// Four interleaved channels (red, green, blue, alpha)
    Rgba,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Rgb => 3,
            ChannelLayout::Rgba => 4,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            3 => Some(ChannelLayout::Rgb),
            4 => Some(ChannelLayout::Rgba),
            _ => None,
        }
    }

    /// Index of the alpha sample within a pixel, if the layout has one
    pub fn alpha_index(&self) -> Option<usize> {
        match self {
            ChannelLayout::Rgb => None,
            ChannelLayout::Rgba => Some(3),
        }
    }
}

// ============================================================================
// Pixel Buffer
// ============================================================================

/// Decoded raster image
///
/// Samples are stored row-major and channel-interleaved:
/// `[R0, G0, B0, (A0), R1, G1, B1, (A1), ...]`.
///
/// The length invariant `samples.len() == width * height * channels` is
/// checked on construction and cannot be broken afterwards since the
/// sample vector is never exposed mutably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    layout: ChannelLayout,
    samples: Vec<u8>,
}

impl PixelBuffer {
    /// Create a pixel buffer from decoded samples
    ///
    /// # Arguments
    /// * `width` - Raster width in pixels
    /// * `height` - Raster height in pixels
    /// * `channels` - Channel count (3 = RGB, 4 = RGBA)
    /// * `samples` - Row-major, channel-interleaved sample data
    ///
    /// # Errors
    /// `InvalidBuffer` when the channel count is unsupported or the sample
    /// count does not match the dimensions. Zero-area rasters are valid and
    /// carry no samples.
    pub fn new(width: usize, height: usize, channels: usize, samples: Vec<u8>) -> Result<Self> {
        let layout = ChannelLayout::from_count(channels).ok_or_else(|| {
            DecayError::InvalidBuffer {
                reason: format!("unsupported channel count {} (expected 3 or 4)", channels),
            }
        })?;

        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels))
            .ok_or_else(|| DecayError::InvalidBuffer {
                reason: format!("dimensions {}x{}x{} overflow", width, height, channels),
            })?;

        if samples.len() != expected {
            return Err(DecayError::InvalidBuffer {
                reason: format!(
                    "sample count {} does not match {}x{}x{} = {}",
                    samples.len(),
                    width,
                    height,
                    channels,
                    expected
                ),
            });
        }

        Ok(Self {
            width,
            height,
            layout,
            samples,
        })
    }

    /// Create a buffer where every sample has the same value
    pub fn filled(width: usize, height: usize, channels: usize, value: u8) -> Result<Self> {
        let len = width.saturating_mul(height).saturating_mul(channels);
        Self::new(width, height, channels, vec![value; len])
    }

    /// Raster width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raster height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of interleaved channels per pixel
    pub fn channels(&self) -> usize {
        self.layout.num_channels()
    }

    /// Channel layout of this buffer
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Whether the last channel is alpha
    pub fn has_alpha(&self) -> bool {
        self.layout.alpha_index().is_some()
    }

    /// Total number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True only for zero-area rasters
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get a reference to all interleaved samples
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Consume the buffer and return its samples (for the encode collaborator)
    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }

    /// Get the samples of one pixel
    ///
    /// # Returns
    /// The channel samples at (x, y), or None if outside the raster
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let channels = self.channels();
        let start = (y * self.width + x) * channels;
        self.samples.get(start..start + channels)
    }

    /// Check that another buffer has the same dimensions and layout
    pub fn same_shape(&self, other: &PixelBuffer) -> bool {
        self.width == other.width && self.height == other.height && self.layout == other.layout
    }

    /// Mean squared difference between two buffers, over all samples
    ///
    /// # Errors
    /// `InvalidBuffer` if the buffers differ in shape.
    pub fn mean_squared_error(&self, other: &PixelBuffer) -> Result<f64> {
        self.check_same_shape(other)?;
        if self.samples.is_empty() {
            return Ok(0.0);
        }

        let sum: f64 = self
            .samples
            .iter()
            .zip(other.samples.iter())
            .map(|(&a, &b)| {
                let d = a as f64 - b as f64;
                d * d
            })
            .sum();

        Ok(sum / self.samples.len() as f64)
    }

    /// Count samples that differ between two buffers
    ///
    /// # Errors
    /// `InvalidBuffer` if the buffers differ in shape.
    pub fn count_differences(&self, other: &PixelBuffer) -> Result<usize> {
        self.check_same_shape(other)?;
        Ok(self
            .samples
            .iter()
            .zip(other.samples.iter())
            .filter(|(a, b)| a != b)
            .count())
    }

    fn check_same_shape(&self, other: &PixelBuffer) -> Result<()> {
        if !self.same_shape(other) {
            return Err(DecayError::InvalidBuffer {
                reason: format!(
                    "cannot compare {}x{}x{} with {}x{}x{}",
                    self.width,
                    self.height,
                    self.channels(),
                    other.width,
                    other.height,
                    other.channels()
                ),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
