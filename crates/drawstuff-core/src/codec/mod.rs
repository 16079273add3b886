//! Image codecs.
//!
//! Netpbm variants are parsed and written by hand in [`netpbm`]; JPEG and PNG
//! are delegated to the `image` crate in [`raster`]. [`decode`] sniffs the
//! payload and [`encode`] dispatches on an [`ImageFormat`].

pub mod netpbm;
pub mod raster;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::buffer::{BufferError, Channels, PixelBuffer};

/// Default ceiling on `width * height * channels` for decoded images (256 MiB).
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 256 * 1024 * 1024;

/// Default JPEG quality used when none is given.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Errors that can occur while decoding or encoding an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The payload does not start with a recognised magic number.
    #[error("Bad magic number: {0:?}")]
    BadMagic(String),

    /// A header token is not a decimal number or is out of range.
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// The input ends before the header is complete.
    #[error("Truncated header")]
    TruncatedHeader,

    /// Fewer samples (ASCII) or bytes (binary) than the header implies.
    #[error("Truncated pixel data: expected {expected}, found {found}")]
    TruncatedPixelData { expected: usize, found: usize },

    /// A pixel token is not a valid sample.
    #[error("Malformed pixel data: {0}")]
    MalformedPixelData(String),

    /// Maxval is zero or above 65535.
    #[error("Invalid maxval: {0} (must be between 1 and 65535)")]
    InvalidMaxval(u32),

    /// A sample exceeds the declared maxval.
    #[error("Sample {value} exceeds maxval {maxval}")]
    SampleOutOfRange { value: u32, maxval: u32 },

    /// The decoded buffer would exceed the configured size ceiling.
    #[error("Image too large: {width}x{height} exceeds the {limit} byte limit")]
    DimensionOverflow { width: u32, height: u32, limit: usize },

    /// Width or height is zero.
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The format tag is not one of the supported formats.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Error reported by the `image` crate.
    #[error("Raster codec error: {0}")]
    Raster(String),
}

impl From<BufferError> for CodecError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::InvalidDimensions { width, height } => {
                CodecError::InvalidDimensions { width, height }
            }
            BufferError::Overflow { width, height, .. } => CodecError::DimensionOverflow {
                width,
                height,
                limit: usize::MAX,
            },
            BufferError::LengthMismatch { expected, actual } => CodecError::TruncatedPixelData {
                expected,
                found: actual,
            },
        }
    }
}

/// Netpbm family of a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetpbmFamily {
    /// PBM, one bit per pixel.
    Bitmap,
    /// PGM, one sample per pixel.
    Graymap,
    /// PPM, three samples per pixel.
    Pixmap,
}

/// Supported output formats and their boundary tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageFormat {
    /// `"jpeg"`
    Jpeg,
    /// `"pbmP1"`, ASCII bitmap
    PbmP1,
    /// `"pbmP4"`, binary bitmap
    PbmP4,
    /// `"pgmP2"`, ASCII graymap
    PgmP2,
    /// `"pgmP5"`, binary graymap
    PgmP5,
    /// `"ppmP3"`, ASCII pixmap
    PpmP3,
    /// `"ppmP6"`, binary pixmap
    PpmP6,
}

impl ImageFormat {
    /// Every format, in boundary order.
    pub const ALL: [ImageFormat; 7] = [
        ImageFormat::Jpeg,
        ImageFormat::PbmP1,
        ImageFormat::PbmP4,
        ImageFormat::PgmP2,
        ImageFormat::PgmP5,
        ImageFormat::PpmP3,
        ImageFormat::PpmP6,
    ];

    /// Boundary tag, e.g. `"ppmP6"`.
    pub fn tag(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::PbmP1 => "pbmP1",
            ImageFormat::PbmP4 => "pbmP4",
            ImageFormat::PgmP2 => "pgmP2",
            ImageFormat::PgmP5 => "pgmP5",
            ImageFormat::PpmP3 => "ppmP3",
            ImageFormat::PpmP6 => "ppmP6",
        }
    }

    /// Format for a Netpbm magic digit (`b'1'..=b'6'`).
    pub fn from_magic(digit: u8) -> Option<Self> {
        match digit {
            b'1' => Some(ImageFormat::PbmP1),
            b'2' => Some(ImageFormat::PgmP2),
            b'3' => Some(ImageFormat::PpmP3),
            b'4' => Some(ImageFormat::PbmP4),
            b'5' => Some(ImageFormat::PgmP5),
            b'6' => Some(ImageFormat::PpmP6),
            _ => None,
        }
    }

    /// Two-byte Netpbm magic, `None` for JPEG.
    pub fn magic(self) -> Option<&'static [u8; 2]> {
        match self {
            ImageFormat::Jpeg => None,
            ImageFormat::PbmP1 => Some(b"P1"),
            ImageFormat::PgmP2 => Some(b"P2"),
            ImageFormat::PpmP3 => Some(b"P3"),
            ImageFormat::PbmP4 => Some(b"P4"),
            ImageFormat::PgmP5 => Some(b"P5"),
            ImageFormat::PpmP6 => Some(b"P6"),
        }
    }

    pub fn is_netpbm(self) -> bool {
        self != ImageFormat::Jpeg
    }

    /// Whether this is an ASCII ("plain") Netpbm variant.
    pub fn is_plain(self) -> bool {
        matches!(
            self,
            ImageFormat::PbmP1 | ImageFormat::PgmP2 | ImageFormat::PpmP3
        )
    }

    pub fn family(self) -> Option<NetpbmFamily> {
        match self {
            ImageFormat::Jpeg => None,
            ImageFormat::PbmP1 | ImageFormat::PbmP4 => Some(NetpbmFamily::Bitmap),
            ImageFormat::PgmP2 | ImageFormat::PgmP5 => Some(NetpbmFamily::Graymap),
            ImageFormat::PpmP3 | ImageFormat::PpmP6 => Some(NetpbmFamily::Pixmap),
        }
    }

    /// Channel layout of a decoded image of this format.
    pub fn channels(self) -> Channels {
        match self.family() {
            Some(NetpbmFamily::Bitmap) | Some(NetpbmFamily::Graymap) => Channels::Gray,
            Some(NetpbmFamily::Pixmap) | None => Channels::Rgb,
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self.family() {
            None => "jpg",
            Some(NetpbmFamily::Bitmap) => "pbm",
            Some(NetpbmFamily::Graymap) => "pgm",
            Some(NetpbmFamily::Pixmap) => "ppm",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self.family() {
            None => "image/jpeg",
            Some(NetpbmFamily::Bitmap) => "image/x-portable-bitmap",
            Some(NetpbmFamily::Graymap) => "image/x-portable-graymap",
            Some(NetpbmFamily::Pixmap) => "image/x-portable-pixmap",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ImageFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("jpg") {
            return Ok(ImageFormat::Jpeg);
        }
        ImageFormat::ALL
            .into_iter()
            .find(|format| format.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| CodecError::UnsupportedFormat(s.to_string()))
    }
}

/// Resource limits applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecLimits {
    /// Largest accepted `width * height * channels`.
    pub max_buffer_bytes: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
        }
    }
}

impl CodecLimits {
    /// Check that a `width x height` image with `channels` fits the limit.
    pub fn check(&self, width: u32, height: u32, channels: Channels) -> Result<usize, CodecError> {
        let len = crate::buffer::buffer_len(width, height, channels)?;
        if len > self.max_buffer_bytes {
            return Err(CodecError::DimensionOverflow {
                width,
                height,
                limit: self.max_buffer_bytes,
            });
        }
        Ok(len)
    }
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Comment lines written into Netpbm headers.
    pub comments: Vec<String>,
    /// JPEG quality, clamped to 1-100.
    pub jpeg_quality: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            comments: Vec::new(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// A decoded image plus any comments found in its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub buffer: PixelBuffer,
    pub comments: Vec<String>,
}

/// Whether `bytes` starts with a Netpbm magic number.
pub fn is_netpbm(bytes: &[u8]) -> bool {
    matches!(bytes, [b'P', b'1'..=b'6', ..])
}

/// `P` followed by any digit, so unsupported variants (`P7`, `P0`) reach the
/// Netpbm header parser and fail with `BadMagic`.
fn has_netpbm_prefix(bytes: &[u8]) -> bool {
    matches!(bytes, [b'P', b'0'..=b'9', ..])
}

/// Decode an encoded image, choosing the codec from the leading bytes.
///
/// `P` plus a digit goes to the Netpbm decoder, everything else to the raster codec.
pub fn decode(bytes: &[u8], limits: &CodecLimits) -> Result<Decoded, CodecError> {
    if has_netpbm_prefix(bytes) {
        netpbm::decode(bytes, limits)
    } else {
        let buffer = raster::decode_raster(bytes, limits)?;
        Ok(Decoded {
            buffer,
            comments: Vec::new(),
        })
    }
}

/// Encode a buffer in the given format.
///
/// The buffer is converted to the layout the format stores: gray for
/// bitmaps and graymaps, RGB for pixmaps and JPEG (alpha dropped).
pub fn encode(
    buffer: &PixelBuffer,
    format: ImageFormat,
    options: &EncodeOptions,
) -> Result<Vec<u8>, CodecError> {
    let bytes = match format {
        ImageFormat::Jpeg => raster::encode_jpeg(buffer, options.jpeg_quality)?,
        _ => netpbm::encode(buffer, format, &options.comments)?,
    };
    debug!(
        format = %format,
        width = buffer.width(),
        height = buffer.height(),
        bytes = bytes.len(),
        "encoded image"
    );
    Ok(bytes)
}
