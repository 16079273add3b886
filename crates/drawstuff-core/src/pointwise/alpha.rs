//! Alpha channel transform.

use serde::{Deserialize, Serialize};

use super::{for_each_pixel, TransformError};
use crate::buffer::PixelBuffer;

/// How the requested level combines with the existing alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlphaMode {
    /// Overwrite alpha with the level.
    #[default]
    Replace,
    /// Scale existing alpha by `level / 255`.
    Multiply,
}

/// Parameters of the alpha transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlphaSpec {
    /// Target alpha level (0 = transparent, 255 = opaque).
    pub level: u8,
    #[serde(default)]
    pub mode: AlphaMode,
}

impl AlphaSpec {
    /// Replace alpha with `level`.
    pub fn new(level: u8) -> Self {
        Self {
            level,
            mode: AlphaMode::Replace,
        }
    }

    /// Blend `level` into the existing alpha.
    pub fn multiply(level: u8) -> Self {
        Self {
            level,
            mode: AlphaMode::Multiply,
        }
    }

    /// Build from an unchecked integer level.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::InvalidParameter`] unless `0 <= level <= 255`.
    pub fn from_level(level: i32) -> Result<Self, TransformError> {
        u8::try_from(level)
            .map(Self::new)
            .map_err(|_| TransformError::invalid("alpha", format!("must be between 0 and 255, got {level}")))
    }
}

/// Set or blend the alpha channel of every pixel.
///
/// Buffers without alpha are widened to RGBA first (opaque), so the returned
/// buffer always has four channels.
pub fn apply_alpha(buffer: PixelBuffer, spec: AlphaSpec) -> PixelBuffer {
    let mut buffer = buffer.to_rgba();
    let level = spec.level;

    match spec.mode {
        AlphaMode::Replace => for_each_pixel(&mut buffer, |px| px[3] = level),
        AlphaMode::Multiply => for_each_pixel(&mut buffer, |px| {
            px[3] = ((px[3] as u16 * level as u16 + 127) / 255) as u8;
        }),
    }
    buffer
}
