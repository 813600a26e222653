//! Bit Glitch Stage
//!
//! Block-level spatial corruption simulating damaged storage: shifted rows
//! and columns, swapped regions, and pixelated patches.
//!
//! Each event is first planned (all random draws happen here, and every
//! planned block lies inside the raster by construction), then applied
//! through bounds-checked accessors. Shift destinations that fall off the
//! raster are clipped: that part of the block is discarded and the vacated
//! pixels keep their previous values.

use super::stage::{param_bool, param_f32, DecayRng, DecayStage, StageParams};
use super::WorkBuffer;
use crate::error::{DecayError, Result};
use crate::impl_stage_common;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, trace};

// ============================================================================
// Constants
// ============================================================================

/// Events applied at full strength
pub const MAX_EVENTS: usize = 12;

/// Block extent as a fraction of the raster dimension at minimal strength
const BASE_BLOCK_FRACTION: f32 = 0.1;

/// Additional block extent fraction at full strength
const BLOCK_FRACTION_PER_STRENGTH: f32 = 0.4;

/// Shift displacement as a fraction of the raster dimension at full strength
const SHIFT_FRACTION_PER_STRENGTH: f32 = 0.25;

/// Smallest pixelation cell
const BASE_CELL_SIZE: usize = 2;

/// Additional cell size at full strength
const CELL_SIZE_PER_STRENGTH: f32 = 6.0;

// ============================================================================
// Glitch Events
// ============================================================================

/// Rectangular region of the raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlitchBlock {
    pub x: i64,
    pub y: i64,
    pub width: usize,
    pub height: usize,
}

/// Kind of corruption applied by one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlitchKind {
    RowShift,
    ColumnShift,
    BlockSwap,
    Pixelate,
}

impl GlitchKind {
    const ALL: [GlitchKind; 4] = [
        GlitchKind::RowShift,
        GlitchKind::ColumnShift,
        GlitchKind::BlockSwap,
        GlitchKind::Pixelate,
    ];
}

/// A fully planned glitch event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlitchEvent {
    /// Move the block horizontally by `offset` pixels
    RowShift { block: GlitchBlock, offset: i64 },
    /// Move the block vertically by `offset` pixels
    ColumnShift { block: GlitchBlock, offset: i64 },
    /// Exchange the block with a same-size region at (target_x, target_y)
    BlockSwap {
        block: GlitchBlock,
        target_x: i64,
        target_y: i64,
    },
    /// Fill `cell`-sized squares of the block with their top-left pixel
    Pixelate { block: GlitchBlock, cell: usize },
}

impl GlitchEvent {
    pub fn kind(&self) -> GlitchKind {
        match self {
            GlitchEvent::RowShift { .. } => GlitchKind::RowShift,
            GlitchEvent::ColumnShift { .. } => GlitchKind::ColumnShift,
            GlitchEvent::BlockSwap { .. } => GlitchKind::BlockSwap,
            GlitchEvent::Pixelate { .. } => GlitchKind::Pixelate,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Number of events for a strength in [0, 1]; at least one
pub fn event_count(strength: f32) -> usize {
    ((strength * MAX_EVENTS as f32).ceil() as usize).clamp(1, MAX_EVENTS)
}

/// Largest block extent along a dimension
fn max_extent(dim: usize, strength: f32) -> usize {
    let fraction = BASE_BLOCK_FRACTION + BLOCK_FRACTION_PER_STRENGTH * strength;
    ((dim as f32 * fraction).ceil() as usize).clamp(1, dim.max(1))
}

/// Largest shift displacement along a dimension
fn max_offset(dim: usize, strength: f32) -> i64 {
    ((dim as f32 * SHIFT_FRACTION_PER_STRENGTH * strength).ceil() as i64).max(1)
}

/// Pixelation cell size for a strength in [0, 1]
fn cell_size(strength: f32) -> usize {
    BASE_CELL_SIZE + (strength * CELL_SIZE_PER_STRENGTH).round() as usize
}

/// Pick a block that lies fully inside a `width` x `height` raster
///
/// A zero-area raster has no such block; the result is a 1x1 block at the
/// origin, which `apply_event` rejects.
fn select_block(width: usize, height: usize, strength: f32, rng: &mut DecayRng) -> GlitchBlock {
    let block_width = rng.gen_range(1..=max_extent(width, strength));
    let block_height = rng.gen_range(1..=max_extent(height, strength));
    GlitchBlock {
        x: rng.gen_range(0..=width.saturating_sub(block_width)) as i64,
        y: rng.gen_range(0..=height.saturating_sub(block_height)) as i64,
        width: block_width,
        height: block_height,
    }
}

// ============================================================================
// Bit Glitcher
// ============================================================================

/// Block displacement stage
///
/// # Parameters
/// - `strength`: Glitch strength (0.0 to 1.0); controls event count,
///   block size, shift distance and pixelation cell size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitGlitcher {
    params: StageParams,
    strength: f32,
}

impl BitGlitcher {
    /// Create a glitch stage
    ///
    /// # Arguments
    /// * `strength` - Glitch strength, clamped to [0, 1]
    pub fn new(strength: f32) -> Self {
        let mut glitcher = Self {
            params: StageParams::default(),
            strength: 0.0,
        };
        glitcher.set_strength(strength);
        glitcher
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn set_strength(&mut self, strength: f32) {
        self.strength = if strength.is_finite() {
            strength.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Draw the next event for a raster of the given size
    pub fn plan_event(&self, width: usize, height: usize, rng: &mut DecayRng) -> GlitchEvent {
        let kind = GlitchKind::ALL[rng.gen_range(0..GlitchKind::ALL.len())];
        let block = select_block(width, height, self.strength, rng);

        match kind {
            GlitchKind::RowShift => {
                let max = max_offset(width, self.strength);
                GlitchEvent::RowShift {
                    block,
                    offset: rng.gen_range(-max..=max),
                }
            }
            GlitchKind::ColumnShift => {
                let max = max_offset(height, self.strength);
                GlitchEvent::ColumnShift {
                    block,
                    offset: rng.gen_range(-max..=max),
                }
            }
            GlitchKind::BlockSwap => GlitchEvent::BlockSwap {
                block,
                target_x: rng.gen_range(0..=width.saturating_sub(block.width)) as i64,
                target_y: rng.gen_range(0..=height.saturating_sub(block.height)) as i64,
            },
            GlitchKind::Pixelate => GlitchEvent::Pixelate {
                block,
                cell: cell_size(self.strength),
            },
        }
    }

    /// Apply a planned event
    ///
    /// # Errors
    /// `OutOfBoundsAccess` if the event's source block is not inside the
    /// raster. Shift destinations outside the raster are clipped, not errors.
    pub fn apply_event(&self, buffer: &mut WorkBuffer, event: &GlitchEvent) -> Result<()> {
        match *event {
            GlitchEvent::RowShift { block, offset } => shift(buffer, block, offset, 0),
            GlitchEvent::ColumnShift { block, offset } => shift(buffer, block, 0, offset),
            GlitchEvent::BlockSwap {
                block,
                target_x,
                target_y,
            } => {
                let source = buffer.copy_block(block.x, block.y, block.width, block.height)?;
                let target = buffer.copy_block(target_x, target_y, block.width, block.height)?;
                buffer.paste_block(block.x, block.y, block.width, block.height, &target)?;
                buffer.paste_block(target_x, target_y, block.width, block.height, &source)
            }
            GlitchEvent::Pixelate { block, cell } => pixelate(buffer, block, cell.max(1)),
        }
    }
}

/// Move a block by (dx, dy), discarding pixels pushed off the raster
fn shift(buffer: &mut WorkBuffer, block: GlitchBlock, dx: i64, dy: i64) -> Result<()> {
    let source = buffer.copy_block(block.x, block.y, block.width, block.height)?;
    let width = buffer.width() as i64;
    let height = buffer.height() as i64;
    let channels = buffer.channels();

    for (i, pixel) in source.chunks_exact(channels).enumerate() {
        let x = block.x + (i % block.width) as i64 + dx;
        let y = block.y + (i / block.width) as i64 + dy;
        if !(0..width).contains(&x) || !(0..height).contains(&y) {
            continue;
        }
        buffer.set_pixel(x, y, pixel)?;
    }
    Ok(())
}

/// Nearest-neighbour downsample of a block, cell by cell
fn pixelate(buffer: &mut WorkBuffer, block: GlitchBlock, cell: usize) -> Result<()> {
    let x_end = block.x + block.width as i64;
    let y_end = block.y + block.height as i64;

    for cell_y in (block.y..y_end).step_by(cell) {
        for cell_x in (block.x..x_end).step_by(cell) {
            let sample = buffer.pixel(cell_x, cell_y)?.to_vec();
            for y in cell_y..(cell_y + cell as i64).min(y_end) {
                for x in cell_x..(cell_x + cell as i64).min(x_end) {
                    buffer.set_pixel(x, y, &sample)?;
                }
            }
        }
    }
    Ok(())
}

impl Default for BitGlitcher {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl DecayStage for BitGlitcher {
    impl_stage_common!(BitGlitcher, "glitch", "Bit Glitch");

    fn process(&mut self, buffer: &mut WorkBuffer, rng: &mut DecayRng) -> Result<()> {
        if !self.params.enabled || self.strength <= 0.0 {
            return Ok(());
        }

        let (width, height) = (buffer.width(), buffer.height());
        if width == 0 || height == 0 {
            return Ok(());
        }

        for index in 0..event_count(self.strength) {
            let event = self.plan_event(width, height, rng);
            trace!(index, kind = ?event.kind(), ?event, "glitch event");

            if let Err(err) = self.apply_event(buffer, &event) {
                error!(?event, %err, "planned glitch event escaped the raster");
                return Err(err);
            }
        }

        Ok(())
    }

    fn get_params(&self) -> Value {
        json!({
            "strength": self.strength,
            "events": if self.strength > 0.0 { event_count(self.strength) } else { 0 },
            "cell_size": cell_size(self.strength),
            "enabled": self.params.enabled
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "strength" => {
                self.set_strength(param_f32("glitch", name, value)?);
                Ok(())
            }
            "enabled" => {
                self.params.enabled = param_bool("glitch", name, value)?;
                Ok(())
            }
            _ => Err(DecayError::InvalidParameter {
                stage: "glitch",
                name: name.to_string(),
                reason: "unknown parameter".to_string(),
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
