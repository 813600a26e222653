//! Working raster for decay stages
//!
//! Stages operate on f32 samples so grain can push values past the u8 range
//! without wrapping; the clamp stage brings them back before conversion.

use crate::engine::{ChannelLayout, PixelBuffer, MAX_SAMPLE};
use crate::error::{DecayError, Result};

/// Convert a working sample to a stored sample: round to nearest, then clamp
#[inline]
pub fn quantize(sample: f32) -> u8 {
    if sample.is_nan() {
        return 0;
    }
    sample.round().clamp(0.0, MAX_SAMPLE as f32) as u8
}

/// Interleaved f32 raster used between decode and the final clamp
///
/// Same layout as [`PixelBuffer`]: row-major, channel-interleaved.
/// Pixel accessors take signed coordinates and bounds-check every access.
#[derive(Clone, Debug)]
pub struct WorkBuffer {
    samples: Vec<f32>,
    width: usize,
    height: usize,
    layout: ChannelLayout,
}

impl WorkBuffer {
    /// Copy a pixel buffer into working precision
    pub fn from_pixels(pixels: &PixelBuffer) -> Self {
        Self {
            samples: pixels.samples().iter().map(|&s| s as f32).collect(),
            width: pixels.width(),
            height: pixels.height(),
            layout: pixels.layout(),
        }
    }

    /// Quantize back into a pixel buffer
    pub fn to_pixels(&self) -> Result<PixelBuffer> {
        PixelBuffer::new(
            self.width,
            self.height,
            self.channels(),
            self.samples.iter().map(|&s| quantize(s)).collect(),
        )
    }

    /// Raster width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raster height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of interleaved channels
    pub fn channels(&self) -> usize {
        self.layout.num_channels()
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Get a reference to all interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Get a mutable reference to all interleaved samples
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Whether every sample is finite and inside [0, 255]
    pub fn is_in_range(&self) -> bool {
        self.samples
            .iter()
            .all(|&s| s.is_finite() && (0.0..=MAX_SAMPLE as f32).contains(&s))
    }

    /// Sample offset of the first channel of pixel (x, y)
    ///
    /// # Errors
    /// `OutOfBoundsAccess` if (x, y) lies outside the raster.
    pub fn pixel_offset(&self, x: i64, y: i64) -> Result<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return Err(DecayError::OutOfBoundsAccess {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok((y as usize * self.width + x as usize) * self.channels())
    }

    /// Get the samples of pixel (x, y)
    pub fn pixel(&self, x: i64, y: i64) -> Result<&[f32]> {
        let start = self.pixel_offset(x, y)?;
        Ok(&self.samples[start..start + self.channels()])
    }

    /// Overwrite pixel (x, y)
    ///
    /// # Errors
    /// `OutOfBoundsAccess` if (x, y) lies outside the raster, or
    /// `InvalidBuffer` if `value` holds fewer samples than the raster has channels.
    pub fn set_pixel(&mut self, x: i64, y: i64, value: &[f32]) -> Result<()> {
        let start = self.pixel_offset(x, y)?;
        let channels = self.channels();
        let value = value.get(..channels).ok_or_else(|| DecayError::InvalidBuffer {
            reason: format!("pixel value has {} samples, expected {}", value.len(), channels),
        })?;
        self.samples[start..start + channels].copy_from_slice(value);
        Ok(())
    }

    /// Snapshot a rectangular block, row by row
    pub fn copy_block(&self, x: i64, y: i64, w: usize, h: usize) -> Result<Vec<f32>> {
        let mut block = Vec::with_capacity(w * h * self.channels());
        for dy in 0..h as i64 {
            for dx in 0..w as i64 {
                block.extend_from_slice(self.pixel(x + dx, y + dy)?);
            }
        }
        Ok(block)
    }

    /// Write a block previously taken with [`copy_block`](Self::copy_block)
    pub fn paste_block(&mut self, x: i64, y: i64, w: usize, h: usize, block: &[f32]) -> Result<()> {
        let channels = self.channels();
        for (i, pixel) in block.chunks_exact(channels).take(w * h).enumerate() {
            let dx = (i % w) as i64;
            let dy = (i / w) as i64;
            self.set_pixel(x + dx, y + dy, pixel)?;
        }
        Ok(())
    }
}
