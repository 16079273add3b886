//! In-memory raster representation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::luminance::luma_u8;

/// Errors raised when constructing a [`PixelBuffer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Width or height is zero.
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// Sample count doesn't match `width * height * channels`.
    #[error("Invalid sample data: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// `width * height * channels` does not fit in memory.
    #[error("Buffer size overflows: {width}x{height}x{channels}")]
    Overflow { width: u32, height: u32, channels: u8 },
}

/// Channel layout of a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Channels {
    /// One luma sample per pixel.
    Gray = 1,
    /// Red, green, blue.
    Rgb = 3,
    /// Red, green, blue, alpha.
    Rgba = 4,
}

impl Channels {
    /// Number of samples per pixel.
    #[inline]
    pub fn count(self) -> usize {
        self as usize
    }

    /// Whether the layout carries an alpha channel.
    #[inline]
    pub fn has_alpha(self) -> bool {
        self == Channels::Rgba
    }

    /// Layout for a given samples-per-pixel count.
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(Channels::Gray),
            3 => Some(Channels::Rgb),
            4 => Some(Channels::Rgba),
            _ => None,
        }
    }
}

/// Compute `width * height * channels`, rejecting zero dimensions and overflow.
pub fn buffer_len(width: u32, height: u32, channels: Channels) -> Result<usize, BufferError> {
    if width == 0 || height == 0 {
        return Err(BufferError::InvalidDimensions { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(channels.count()))
        .ok_or(BufferError::Overflow {
            width,
            height,
            channels: channels as u8,
        })
}

/// A row-major raster with 8-bit samples and no row padding.
///
/// Invariant: `samples.len() == width * height * channels` and both
/// dimensions are non-zero. Every constructor enforces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: Channels,
    samples: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap existing sample data.
    pub fn new(
        width: u32,
        height: u32,
        channels: Channels,
        samples: Vec<u8>,
    ) -> Result<Self, BufferError> {
        let expected = buffer_len(width, height, channels)?;
        if samples.len() != expected {
            return Err(BufferError::LengthMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    /// Allocate a buffer with every sample set to `value`.
    pub fn filled(
        width: u32,
        height: u32,
        channels: Channels,
        value: u8,
    ) -> Result<Self, BufferError> {
        let len = buffer_len(width, height, channels)?;
        Ok(Self {
            width,
            height,
            channels,
            samples: vec![value; len],
        })
    }

    /// Create a buffer from an `image::RgbImage`.
    pub fn from_rgb_image(img: image::RgbImage) -> Result<Self, BufferError> {
        let (width, height) = img.dimensions();
        Self::new(width, height, Channels::Rgb, img.into_raw())
    }

    /// Create a buffer from an `image::RgbaImage`.
    pub fn from_rgba_image(img: image::RgbaImage) -> Result<Self, BufferError> {
        let (width, height) = img.dimensions();
        Self::new(width, height, Channels::Rgba, img.into_raw())
    }

    /// Create a buffer from an `image::GrayImage`.
    pub fn from_gray_image(img: image::GrayImage) -> Result<Self, BufferError> {
        let (width, height) = img.dimensions();
        Self::new(width, height, Channels::Gray, img.into_raw())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Get the total number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of bytes in one row.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.width as usize * self.channels.count()
    }

    /// Get the size of the sample buffer in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    #[inline]
    pub fn samples_mut(&mut self) -> &mut [u8] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }

    /// Samples of the pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        let start = self.offset(x, y)?;
        Some(&self.samples[start..start + self.channels.count()])
    }

    /// Mutable samples of the pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> Option<&mut [u8]> {
        let start = self.offset(x, y)?;
        let n = self.channels.count();
        Some(&mut self.samples[start..start + n])
    }

    /// Iterate over rows, top to bottom.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, u8> {
        let stride = self.row_stride();
        self.samples.chunks_exact(stride)
    }

    /// Iterate mutably over rows, top to bottom.
    pub fn rows_mut(&mut self) -> std::slice::ChunksExactMut<'_, u8> {
        let stride = self.row_stride();
        self.samples.chunks_exact_mut(stride)
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * self.channels.count())
    }

    /// Convert to the requested layout. Returns `self` untouched if it already matches.
    pub fn with_channels(self, channels: Channels) -> Self {
        match channels {
            Channels::Gray => self.to_gray(),
            Channels::Rgb => self.to_rgb(),
            Channels::Rgba => self.to_rgba(),
        }
    }

    /// Convert to single-channel luma (BT.601). Alpha is dropped.
    pub fn to_gray(self) -> Self {
        let samples = match self.channels {
            Channels::Gray => return self,
            Channels::Rgb | Channels::Rgba => self
                .samples
                .chunks_exact(self.channels.count())
                .map(|px| luma_u8(px[0], px[1], px[2]))
                .collect(),
        };
        self.relayout(Channels::Gray, samples)
    }

    /// Convert to RGB. Gray is replicated, alpha is dropped.
    pub fn to_rgb(self) -> Self {
        let samples = match self.channels {
            Channels::Rgb => return self,
            Channels::Gray => self.samples.iter().flat_map(|&v| [v, v, v]).collect(),
            Channels::Rgba => self
                .samples
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
        };
        self.relayout(Channels::Rgb, samples)
    }

    /// Convert to RGBA. Missing alpha is set to fully opaque.
    pub fn to_rgba(self) -> Self {
        let samples = match self.channels {
            Channels::Rgba => return self,
            Channels::Gray => self.samples.iter().flat_map(|&v| [v, v, v, 255]).collect(),
            Channels::Rgb => self
                .samples
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 255])
                .collect(),
        };
        self.relayout(Channels::Rgba, samples)
    }

    fn relayout(&self, channels: Channels, samples: Vec<u8>) -> Self {
        debug_assert_eq!(samples.len(), self.pixel_count() * channels.count());
        Self {
            width: self.width,
            height: self.height,
            channels,
            samples,
        }
    }

    /// Convert into an `image::DynamicImage` for the raster codecs.
    pub fn into_dynamic_image(self) -> Option<image::DynamicImage> {
        let (w, h) = (self.width, self.height);
        match self.channels {
            Channels::Gray => image::GrayImage::from_raw(w, h, self.samples)
                .map(image::DynamicImage::ImageLuma8),
            Channels::Rgb => {
                image::RgbImage::from_raw(w, h, self.samples).map(image::DynamicImage::ImageRgb8)
            }
            Channels::Rgba => image::RgbaImage::from_raw(w, h, self.samples)
                .map(image::DynamicImage::ImageRgba8),
        }
    }
}
