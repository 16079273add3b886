//! Export pipeline: decode, transform, encode, persist.
//!
//! Every stage runs to completion in memory before anything touches the
//! destination. The encoded bytes are written to a uniquely named sibling
//! temporary file and renamed over the destination, so a failed export never
//! leaves a partial file behind.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, info_span, instrument, warn};

use crate::buffer::PixelBuffer;
use crate::codec::{self, CodecError, CodecLimits, EncodeOptions, ImageFormat, DEFAULT_JPEG_QUALITY};
use crate::pointwise::{self, composite_over, TransformError, TransformSpec};

/// Errors that abort an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    /// A canvas layer has a different size from the bottom layer.
    #[error("Layer {index} is {found:?}, expected {expected:?}")]
    LayerMismatch {
        index: usize,
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("No layers to export")]
    NoLayers,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Where the pixels of an export come from.
#[derive(Debug, Clone)]
pub enum ExportSource {
    /// An already rasterised buffer.
    Buffer(PixelBuffer),
    /// One encoded image (Netpbm, JPEG or PNG).
    Encoded(Vec<u8>),
    /// Encoded canvas layers, bottom first, flattened with source-over.
    Layers(Vec<Vec<u8>>),
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// JPEG quality (1-100).
    pub jpeg_quality: u8,
    /// Comment lines written to Netpbm headers.
    pub comments: Vec<String>,
    /// Limits applied when decoding encoded sources.
    pub limits: CodecLimits,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            comments: Vec::new(),
            limits: CodecLimits::default(),
        }
    }
}

impl ExportOptions {
    fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            comments: self.comments.clone(),
            jpeg_quality: self.jpeg_quality,
        }
    }
}

/// One export job.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub source: ExportSource,
    /// Applied in order after decoding.
    pub transforms: Vec<TransformSpec>,
    pub target: ImageFormat,
    pub destination: PathBuf,
}

/// What a successful export wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub destination: PathBuf,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub bytes_written: usize,
}

/// Runs exports with a fixed set of [`ExportOptions`].
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    options: ExportOptions,
}

impl Exporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Turn a source into a pixel buffer.
    pub fn load(&self, source: ExportSource) -> Result<PixelBuffer, ExportError> {
        match source {
            ExportSource::Buffer(buffer) => Ok(buffer),
            ExportSource::Encoded(bytes) => {
                Ok(codec::decode(&bytes, &self.options.limits)?.buffer)
            }
            ExportSource::Layers(layers) => flatten_layers(&layers, &self.options.limits),
        }
    }

    fn render_buffer(
        &self,
        source: ExportSource,
        transforms: &[TransformSpec],
    ) -> Result<PixelBuffer, ExportError> {
        let buffer = {
            let _span = info_span!("decode").entered();
            self.load(source)?
        };
        let _span = info_span!("transform", count = transforms.len()).entered();
        Ok(pointwise::apply_transforms(buffer, transforms)?)
    }

    /// Decode, transform and encode without touching the filesystem.
    #[instrument(skip_all, fields(target = %target))]
    pub fn render(
        &self,
        source: ExportSource,
        transforms: &[TransformSpec],
        target: ImageFormat,
    ) -> Result<Vec<u8>, ExportError> {
        let buffer = self.render_buffer(source, transforms)?;
        Ok(codec::encode(&buffer, target, &self.options.encode_options())?)
    }

    /// Decode and transform, then encode as PNG so alpha survives.
    #[instrument(skip_all, fields(transforms = transforms.len()))]
    pub fn render_png(
        &self,
        source: ExportSource,
        transforms: &[TransformSpec],
    ) -> Result<Vec<u8>, ExportError> {
        let buffer = self.render_buffer(source, transforms)?;
        Ok(codec::raster::encode_png(&buffer)?)
    }

    /// Render the request and atomically write it to its destination.
    #[instrument(
        skip_all,
        fields(target = %request.target, destination = %request.destination.display())
    )]
    pub fn export(&self, request: ExportRequest) -> Result<ExportSummary, ExportError> {
        let ExportRequest {
            source,
            transforms,
            target,
            destination,
        } = request;

        let buffer = self.render_buffer(source, &transforms)?;
        let bytes = {
            let _span = info_span!("encode").entered();
            codec::encode(&buffer, target, &self.options.encode_options())?
        };
        {
            let _span = info_span!("persist").entered();
            persist(&destination, &bytes)?;
        }

        info!(
            width = buffer.width(),
            height = buffer.height(),
            bytes = bytes.len(),
            "export committed"
        );
        Ok(ExportSummary {
            destination,
            format: target,
            width: buffer.width(),
            height: buffer.height(),
            bytes_written: bytes.len(),
        })
    }
}

/// Flatten encoded canvas layers into one image and save it.
///
/// Layers are decoded and drawn bottom to top with source-over.
pub fn save_canvas_image(
    destination: impl AsRef<Path>,
    format: ImageFormat,
    layers: Vec<Vec<u8>>,
    options: ExportOptions,
) -> Result<ExportSummary, ExportError> {
    Exporter::new(options).export(ExportRequest {
        source: ExportSource::Layers(layers),
        transforms: Vec::new(),
        target: format,
        destination: destination.as_ref().to_path_buf(),
    })
}

/// Decode layers and composite them bottom to top.
///
/// A single layer is returned in its decoded layout; several layers produce RGBA.
pub fn flatten_layers(layers: &[Vec<u8>], limits: &CodecLimits) -> Result<PixelBuffer, ExportError> {
    let (first, rest) = layers.split_first().ok_or(ExportError::NoLayers)?;
    let mut canvas = codec::decode(first, limits)?.buffer;
    let expected = (canvas.width(), canvas.height());

    for (offset, bytes) in rest.iter().enumerate() {
        let layer = codec::decode(bytes, limits)?.buffer;
        let found = (layer.width(), layer.height());
        if found != expected {
            return Err(ExportError::LayerMismatch {
                index: offset + 1,
                expected,
                found,
            });
        }
        canvas = composite_over(canvas, &layer)?;
    }

    debug!(layers = layers.len(), width = expected.0, height = expected.1, "flattened layers");
    Ok(canvas)
}

/// Write `bytes` to a fresh temporary file next to `destination`, then rename
/// it over `destination`.
///
/// Every call gets its own uniquely named temporary file, so concurrent
/// exports to the same path never share one. On failure the temporary file
/// is removed when it drops and the destination is untouched.
pub fn persist(destination: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let file_name = destination.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("destination has no file name: {}", destination.display()),
        )
    })?;
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut prefix = OsString::from(".");
    prefix.push(file_name);
    prefix.push(".");
    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;

    temp.persist(destination).map_err(|err| {
        warn!(
            temp = %err.file.path().display(),
            error = %err.error,
            "failed to move temporary export file into place"
        );
        err.error
    })?;

    debug!(destination = %destination.display(), bytes = bytes.len(), "persisted export");
    Ok(())
}
