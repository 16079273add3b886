//! Point-wise pixel transformations.
//!
//! Every transform maps each pixel independently of its neighbours, so the
//! engine is free to visit rows in any order. With the `parallel` feature the
//! rows are split across a rayon thread pool; results are identical either way.
//!
//! # Transform families
//!
//! - [`GrayscaleMethod`] - replace R, G, B with a single luma value
//! - [`AlphaSpec`] - set or blend the alpha channel (widens to RGBA)
//! - [`RgbAdjustment`] - per-channel arithmetic, inversion, brightness, contrast
//!
//! # Example
//!
//! ```ignore
//! use drawstuff_core::pointwise::{apply_transforms, TransformSpec, GrayscaleMethod};
//!
//! let gray = apply_transforms(buffer, &[TransformSpec::Grayscale(GrayscaleMethod::Weighted)])?;
//! ```

mod alpha;
mod channel;
mod composite;
mod grayscale;

use thiserror::Error;
use tracing::debug;

use crate::buffer::PixelBuffer;

pub use alpha::{apply_alpha, AlphaMode, AlphaSpec};
pub use channel::{apply_rgb_adjustment, RgbAdjustment};
pub use composite::composite_over;
pub use grayscale::{apply_grayscale, GrayscaleMethod};

/// Errors raised while validating or applying a transform.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// The transform or operation name is not recognised.
    #[error("Unsupported transform: {0}")]
    UnsupportedTransform(String),

    /// A parameter is missing, unparsable or outside its declared range.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Two buffers that must line up have different sizes.
    #[error("Dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
}

impl TransformError {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        TransformError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// A single point-wise operation and its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformSpec {
    Grayscale(GrayscaleMethod),
    Alpha(AlphaSpec),
    Rgb(RgbAdjustment),
}

impl TransformSpec {
    /// Reject parameters outside their declared ranges before touching pixels.
    pub fn validate(&self) -> Result<(), TransformError> {
        match self {
            TransformSpec::Grayscale(_) | TransformSpec::Alpha(_) => Ok(()),
            TransformSpec::Rgb(adjustment) => adjustment.validate(),
        }
    }

    /// Short name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            TransformSpec::Grayscale(_) => "grayscale",
            TransformSpec::Alpha(_) => "alpha",
            TransformSpec::Rgb(_) => "rgb",
        }
    }
}

/// Apply one transform to a buffer.
///
/// Width and height are preserved. The channel count changes only when an
/// alpha transform widens a gray or RGB buffer to RGBA.
///
/// # Errors
///
/// Returns [`TransformError::InvalidParameter`] if the spec's parameters are
/// out of range.
pub fn apply_transform(
    buffer: PixelBuffer,
    spec: &TransformSpec,
) -> Result<PixelBuffer, TransformError> {
    spec.validate()?;

    debug!(
        transform = spec.name(),
        width = buffer.width(),
        height = buffer.height(),
        channels = buffer.channels().count(),
        "applying point-wise transform"
    );

    let out = match spec {
        TransformSpec::Grayscale(method) => apply_grayscale(buffer, *method),
        TransformSpec::Alpha(alpha) => apply_alpha(buffer, *alpha),
        TransformSpec::Rgb(adjustment) => apply_rgb_adjustment(buffer, adjustment)?,
    };
    Ok(out)
}

/// Apply transforms in order, stopping at the first failure.
pub fn apply_transforms(
    buffer: PixelBuffer,
    specs: &[TransformSpec],
) -> Result<PixelBuffer, TransformError> {
    specs
        .iter()
        .try_fold(buffer, |buffer, spec| apply_transform(buffer, spec))
}

/// Run `f` on every pixel's samples, row by row.
pub(crate) fn for_each_pixel<F>(buffer: &mut PixelBuffer, f: F)
where
    F: Fn(&mut [u8]) + Send + Sync,
{
    let n = buffer.channels().count();
    let stride = buffer.row_stride();

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        buffer
            .samples_mut()
            .par_chunks_mut(stride)
            .for_each(|row| row.chunks_exact_mut(n).for_each(&f));
    }

    #[cfg(not(feature = "parallel"))]
    buffer
        .samples_mut()
        .chunks_exact_mut(stride)
        .for_each(|row| row.chunks_exact_mut(n).for_each(&f));
}
