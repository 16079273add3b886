//! JPEG and PNG through the `image` crate.
//!
//! JPEG is the photographic export format. PNG is what the canvas hands us
//! and what point-wise previews are sent back as.

use std::borrow::Cow;
use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageReader, Limits};
use tracing::debug;

use super::{CodecError, CodecLimits};
use crate::buffer::{Channels, PixelBuffer};

/// EXIF orientation (tag 0x0112).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Orientation {
    #[default]
    Normal = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    /// Flip horizontal + rotate 270 CW.
    Transpose = 5,
    Rotate90CW = 6,
    /// Flip horizontal + rotate 90 CW.
    Transverse = 7,
    Rotate270CW = 8,
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

fn raster_err(e: impl std::fmt::Display) -> CodecError {
    CodecError::Raster(e.to_string())
}

/// Decode a JPEG or PNG, applying EXIF orientation when present.
///
/// Images with an alpha channel decode to RGBA, everything else to RGB.
///
/// # Errors
///
/// Returns [`CodecError::Raster`] if the bytes are not a decodable image and
/// [`CodecError::DimensionOverflow`] if the result exceeds `limits`.
pub fn decode_raster(bytes: &[u8], limits: &CodecLimits) -> Result<PixelBuffer, CodecError> {
    let orientation = read_orientation(bytes);

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(raster_err)?;
    let mut image_limits = Limits::default();
    image_limits.max_alloc = Some(limits.max_buffer_bytes as u64);
    reader.limits(image_limits);

    let img = apply_orientation(reader.decode().map_err(raster_err)?, orientation);

    let channels = if img.color().has_alpha() {
        Channels::Rgba
    } else {
        Channels::Rgb
    };
    limits.check(img.width(), img.height(), channels)?;

    debug!(
        width = img.width(),
        height = img.height(),
        ?orientation,
        alpha = channels.has_alpha(),
        "decoded raster image"
    );

    let buffer = match channels {
        Channels::Rgba => PixelBuffer::from_rgba_image(img.into_rgba8())?,
        _ => PixelBuffer::from_rgb_image(img.into_rgb8())?,
    };
    Ok(buffer)
}

/// EXIF orientation of `bytes`, or [`Orientation::Normal`] if there is none.
pub fn read_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    Reader::new()
        .read_from_container(&mut cursor)
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .map_or(Orientation::Normal, Orientation::from)
}

fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}

/// Encode as baseline JPEG. Gray stays single-channel; alpha is dropped.
///
/// `quality` is clamped to 1-100.
pub fn encode_jpeg(buffer: &PixelBuffer, quality: u8) -> Result<Vec<u8>, CodecError> {
    let quality = quality.clamp(1, 100);

    let (buffer, color): (Cow<'_, PixelBuffer>, ExtendedColorType) = match buffer.channels() {
        Channels::Gray => (Cow::Borrowed(buffer), ExtendedColorType::L8),
        Channels::Rgb => (Cow::Borrowed(buffer), ExtendedColorType::Rgb8),
        Channels::Rgba => (Cow::Owned(buffer.clone().to_rgb()), ExtendedColorType::Rgb8),
    };

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality)
        .write_image(buffer.samples(), buffer.width(), buffer.height(), color)
        .map_err(raster_err)?;
    Ok(out.into_inner())
}

/// Encode as PNG in the buffer's own layout.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, CodecError> {
    let color = match buffer.channels() {
        Channels::Gray => ExtendedColorType::L8,
        Channels::Rgb => ExtendedColorType::Rgb8,
        Channels::Rgba => ExtendedColorType::Rgba8,
    };

    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(buffer.samples(), buffer.width(), buffer.height(), color)
        .map_err(raster_err)?;
    Ok(out)
}
