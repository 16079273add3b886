//! WASM bindings for image transformations.
//!
//! Every function takes the source image as encoded bytes (PNG from a canvas,
//! JPEG, or any Netpbm variant) and returns encoded bytes. Alpha, RGB and
//! filter results come back as PNG so transparency survives; grayscale
//! results are encoded in the caller's chosen export format.

use drawstuff_core::binarize::{binarize, binarize_local, LocalMethod, ThresholdMethod};
use drawstuff_core::codec::raster::encode_png;
use drawstuff_core::filter::{self, Border, Filter};
use drawstuff_core::histogram::{apply_histogram, HistogramMode};
use drawstuff_core::morphology::{morphology, MorphOp, StructuringElement};
use drawstuff_core::{
    AlphaSpec, ExportError, ExportSource, Exporter, GrayscaleMethod, ImageFormat, PixelBuffer,
    RgbAdjustment, TransformSpec,
};
use wasm_bindgen::prelude::*;

use crate::js_error;

pub(crate) fn grayscale_to(
    source: &[u8],
    output_format: &str,
    method: Option<&str>,
) -> Result<Vec<u8>, ExportError> {
    let target: ImageFormat = output_format.parse()?;
    let method = match method {
        Some(name) => name.parse::<GrayscaleMethod>()?,
        None => GrayscaleMethod::default(),
    };
    Exporter::default().render(
        ExportSource::Encoded(source.to_vec()),
        &[TransformSpec::Grayscale(method)],
        target,
    )
}

pub(crate) fn alpha_png(alpha_level: i32, source: &[u8]) -> Result<Vec<u8>, ExportError> {
    let spec = AlphaSpec::from_level(alpha_level)?;
    Exporter::default().render_png(
        ExportSource::Encoded(source.to_vec()),
        &[TransformSpec::Alpha(spec)],
    )
}

pub(crate) fn rgb_png<S: AsRef<str>>(
    channel_adjustments: &[S],
    source: &[u8],
) -> Result<Vec<u8>, ExportError> {
    let adjustment = RgbAdjustment::parse(channel_adjustments)?;
    Exporter::default().render_png(
        ExportSource::Encoded(source.to_vec()),
        &[TransformSpec::Rgb(adjustment)],
    )
}

fn load(source: &[u8]) -> Result<PixelBuffer, ExportError> {
    Exporter::default().load(ExportSource::Encoded(source.to_vec()))
}

pub(crate) fn histogram_png(source: &[u8], mode: &str) -> Result<Vec<u8>, ExportError> {
    let mode: HistogramMode = mode.parse()?;
    Ok(encode_png(&apply_histogram(load(source)?, mode))?)
}

pub(crate) fn binarize_png(
    source: &[u8],
    method: &str,
    value: Option<f64>,
) -> Result<Vec<u8>, ExportError> {
    let method = ThresholdMethod::from_parts(method, value)?;
    Ok(encode_png(&binarize(load(source)?, method)?)?)
}

pub(crate) fn binarize_local_png(
    source: &[u8],
    method: &str,
    window: Option<f64>,
    param: Option<f64>,
) -> Result<Vec<u8>, ExportError> {
    let method = LocalMethod::from_parts(method, window, param)?;
    Ok(encode_png(&binarize_local(load(source)?, method)?)?)
}

pub(crate) fn filter_png(
    source: &[u8],
    name: &str,
    size: Option<f64>,
    border: Option<&str>,
) -> Result<Vec<u8>, ExportError> {
    let kind = Filter::from_parts(name, size)?;
    let border = match border {
        Some(name) => name.parse::<Border>()?,
        None => kind.default_border(),
    };
    Ok(encode_png(&filter::apply_filter(load(source)?, kind, border)?)?)
}

pub(crate) fn morphology_png(
    source: &[u8],
    op: &str,
    shape: Option<&str>,
    size: Option<f64>,
) -> Result<Vec<u8>, ExportError> {
    let op: MorphOp = op.parse()?;
    let element = StructuringElement::from_parts(shape, size)?;
    Ok(encode_png(&morphology(load(source)?, op, element)?)?)
}

/// Convert an image to grayscale and encode it for export.
///
/// # Arguments
///
/// * `source` - Encoded source image
/// * `output_format` - One of `"jpeg"`, `"pbmP1"`, `"pbmP4"`, `"pgmP2"`,
///   `"pgmP5"`, `"ppmP3"`, `"ppmP6"`
/// * `method` - `"weights"` (BT.601, the default) or `"average"`
///
/// # Example (TypeScript)
///
/// ```typescript
/// const pgm = apply_grayscale_transform(png, 'pgmP2', 'average');
/// ```
#[wasm_bindgen]
pub fn apply_grayscale_transform(
    source: &[u8],
    output_format: &str,
    method: Option<String>,
) -> Result<Vec<u8>, JsValue> {
    grayscale_to(source, output_format, method.as_deref()).map_err(js_error)
}

/// Set the alpha channel of every pixel to `alpha_level` (0-255). Returns PNG.
#[wasm_bindgen]
pub fn apply_alpha_transform(alpha_level: i32, source: &[u8]) -> Result<Vec<u8>, JsValue> {
    alpha_png(alpha_level, source).map_err(js_error)
}

/// Apply a per-channel adjustment. Returns PNG.
///
/// `channel_adjustments` is an operation name followed by its values:
///
/// ```typescript
/// apply_rgb_transform(['addition', '10', '0', '0'], png);
/// apply_rgb_transform(['invert'], png);
/// apply_rgb_transform(['contrast', '1.5'], png);
/// ```
#[wasm_bindgen]
pub fn apply_rgb_transform(
    channel_adjustments: js_sys::Array,
    source: &[u8],
) -> Result<Vec<u8>, JsValue> {
    let values = channel_adjustments
        .iter()
        .map(|value| {
            value
                .as_string()
                .or_else(|| value.as_f64().map(|n| n.to_string()))
                .ok_or_else(|| js_error("channel adjustments must be strings or numbers"))
        })
        .collect::<Result<Vec<String>, JsValue>>()?;
    rgb_png(&values, source).map_err(js_error)
}

/// Stretch (`"stretch"`) or equalize (`"equalize"`) the luminance histogram.
/// Returns a grayscale PNG.
#[wasm_bindgen]
pub fn apply_histogram_transform(source: &[u8], mode: &str) -> Result<Vec<u8>, JsValue> {
    histogram_png(source, mode).map_err(js_error)
}

/// Threshold an image to black and white. Returns a grayscale PNG.
///
/// | `method`           | `value`                       |
/// |--------------------|-------------------------------|
/// | `"manual"`         | threshold, 0-255              |
/// | `"percent-black"`  | share of black pixels, 0-100  |
/// | `"mean-iterative"` | maximum iterations, 0-100     |
/// | `"otsu"`           | unused                        |
#[wasm_bindgen]
pub fn binarize_image(source: &[u8], method: &str, value: Option<f64>) -> Result<Vec<u8>, JsValue> {
    binarize_png(source, method, value).map_err(js_error)
}

/// Threshold each pixel against its neighbourhood. Returns a grayscale PNG.
///
/// | `method`    | `param`                          | default window |
/// |-------------|----------------------------------|----------------|
/// | `"niblack"` | `k`, default -0.2                | 15             |
/// | `"bernsen"` | contrast threshold, default 15   | 15             |
///
/// `window` is an odd side length between 3 and 51.
#[wasm_bindgen]
pub fn binarize_local_image(
    source: &[u8],
    method: &str,
    window: Option<f64>,
    param: Option<f64>,
) -> Result<Vec<u8>, JsValue> {
    binarize_local_png(source, method, window, param).map_err(js_error)
}

/// Apply a neighbourhood filter. Returns PNG.
///
/// # Arguments
///
/// * `name` - `"mean"`, `"median"`, `"gaussian"` or `"sobel"`
/// * `size` - Odd window side, 3 to 15 (default 3; Sobel is always 3)
/// * `border` - `"shrink"` or `"replicate"`. Mean and median shrink by
///   default, Gaussian and Sobel replicate.
///
/// # Example (TypeScript)
///
/// ```typescript
/// const blurred = apply_filter(png, 'gaussian', 5);
/// const edges = apply_filter(png, 'sobel');
/// ```
#[wasm_bindgen]
pub fn apply_filter(
    source: &[u8],
    name: &str,
    size: Option<f64>,
    border: Option<String>,
) -> Result<Vec<u8>, JsValue> {
    filter_png(source, name, size, border.as_deref()).map_err(js_error)
}

/// Dilate, erode, open or close the grayscale image. Returns a grayscale PNG.
///
/// `shape` is `"cross"` (default) or `"square"`; `size` is an odd side
/// length between 3 and 15 (default 3).
#[wasm_bindgen]
pub fn apply_morphology(
    source: &[u8],
    operation: &str,
    shape: Option<String>,
    size: Option<f64>,
) -> Result<Vec<u8>, JsValue> {
    morphology_png(source, operation, shape.as_deref(), size).map_err(js_error)
}
