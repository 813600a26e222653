//! Error handling for BitRot
//!
//! Every failure is fatal to the single `decay` call that raised it; the
//! engine never returns partially processed output.

use thiserror::Error;

/// Result type alias for BitRot operations
pub type Result<T> = std::result::Result<T, DecayError>;

/// Main error type for decay operations
#[derive(Error, Debug)]
pub enum DecayError {
    // Input Errors
    #[error("Invalid pixel buffer: {reason}")]
    InvalidBuffer { reason: String },

    #[error("Invalid integrity value: {value} (expected a number in [0.0, 1.0])")]
    InvalidIntegrity { value: f32 },

    #[error("Invalid decay configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Invalid value for {stage} parameter '{name}': {reason}")]
    InvalidParameter {
        stage: &'static str,
        name: String,
        reason: String,
    },

    // Internal invariant violations
    #[error("Out of bounds access at ({x}, {y}) in {width}x{height} raster")]
    OutOfBoundsAccess {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DecayError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            DecayError::InvalidBuffer { .. } => "INVALID_BUFFER",
            DecayError::InvalidIntegrity { .. } => "INVALID_INTEGRITY",
            DecayError::InvalidConfig { .. } => "INVALID_CONFIG",
            DecayError::InvalidParameter { .. } => "INVALID_PARAMETER",
            DecayError::OutOfBoundsAccess { .. } => "OUT_OF_BOUNDS_ACCESS",
            DecayError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can fix the input and retry the whole call
    ///
    /// `OutOfBoundsAccess` is an engine bug, not a bad input, so retrying
    /// with the same buffer shape cannot help.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DecayError::OutOfBoundsAccess { .. })
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            DecayError::InvalidBuffer { .. } => vec![
                "Check that samples.len() == width * height * channels",
                "Convert the image to RGB or RGBA (3 or 4 channels) before decaying",
            ],
            DecayError::InvalidIntegrity { .. } => vec![
                "Pass a finite number; values outside [0.0, 1.0] are clamped",
            ],
            DecayError::InvalidConfig { .. } => vec![
                "Derive the configuration with DecayConfig::from_integrity",
                "Strength and intensity fields must be finite and within [0.0, 1.0]",
            ],
            DecayError::InvalidParameter { .. } => vec![
                "Check the parameter name against the stage's get_params() output",
            ],
            _ => vec![],
        }
    }
}
